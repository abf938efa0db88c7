/// Build a `Command`.
///
/// ```
/// #[macro_use] extern crate hpaxos;
/// use hpaxos::proto::*;
///
/// assert_eq!(Command::put(5, 9), cmd!(put 5, 9));
/// assert_eq!(Command::get(5), cmd!(get 5));
/// assert_eq!(Command::rmw(5, 1), cmd!(rmw 5, 1));
/// assert_eq!(Command::noop(), cmd!());
/// ```
#[macro_export]
#[allow(unused_macros)]
macro_rules! cmd {
    () => {
        $crate::proto::Command::noop()
    };
    (put $key:expr, $val:expr) => {
        $crate::proto::Command::put($key, $val)
    };
    (get $key:expr) => {
        $crate::proto::Command::get($key)
    };
    (rmw $key:expr, $delta:expr) => {
        $crate::proto::Command::rmw($key, $delta)
    };
}

/// Build a `Vec<Command>`: `cmds![(put 1, 2), (get 1), ()]`.
#[macro_export]
#[allow(unused_macros)]
macro_rules! cmds {
    [$( ( $($c:tt)* ) ),* $(,)*] => {
        vec![$( $crate::cmd!($($c)*) ),*]
    };
}

/// Build a register `Payload`: `payload!(timestamp, proposer_id, value)`.
#[macro_export]
#[allow(unused_macros)]
macro_rules! payload {
    ($ts:expr, $pid:expr, $val:expr) => {
        $crate::proto::Payload {
            tag: $crate::proto::Tag {
                timestamp: $ts as i64,
                proposer_id: $pid as i64,
            },
            value: $val as i64,
        }
    };
}
