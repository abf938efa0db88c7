use std::{io, result};

use slog::{Drain, OwnedKVList, Record, KV};
use slog_term::{Decorator, RecordDecorator, Serializer};

use hpaxos::proto::ReplicaId;

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f %:z";

/// LogFormat writes one line per record:
///
/// ```text
/// [2020/05/03 10:13:55.035 +08:00] [INFO] [r1] [src/server/server.rs:52] msg key: value
/// ```
///
/// The replica tag tells apart the logs of replicas sharing a process or a
/// file.
pub struct LogFormat<D>
where
    D: Decorator,
{
    decorator: D,
    replica_id: ReplicaId,
}

impl<D> Drain for LogFormat<D>
where
    D: Decorator,
{
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> result::Result<Self::Ok, Self::Err> {
        self.format(record, values)
    }
}

impl<D> LogFormat<D>
where
    D: Decorator,
{
    pub fn new(d: D, replica_id: ReplicaId) -> LogFormat<D> {
        LogFormat {
            decorator: d,
            replica_id,
        }
    }

    fn format(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        self.decorator.with_record(record, values, |decorator| {
            write_log_header(decorator, record, self.replica_id)?;
            write_log_msg(decorator, record)?;
            write_log_fields(decorator, record, values)?;

            decorator.start_whitespace()?;
            writeln!(decorator)?;

            decorator.flush()
        })
    }
}

fn write_log_header(
    rd: &mut dyn RecordDecorator,
    record: &Record,
    replica_id: ReplicaId,
) -> io::Result<()> {
    rd.start_timestamp()?;
    write!(rd, "[{}]", chrono::Local::now().format(TIMESTAMP_FORMAT))?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_level()?;
    write!(rd, "[{}]", record.level().as_short_str())?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_msg()?;
    write!(rd, "[r{}]", replica_id)?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    // there is no `start_line()` or `start_file()`
    rd.start_msg()?;
    write!(rd, "[{}:{}]", record.file(), record.line())
}

fn write_log_msg(rd: &mut dyn RecordDecorator, record: &Record) -> io::Result<()> {
    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_msg()?;
    write!(rd, "{}", record.msg())
}

fn write_log_fields(
    rd: &mut dyn RecordDecorator,
    record: &Record,
    values: &OwnedKVList,
) -> io::Result<()> {
    // no comma, kvs are printed in the order they are written
    let mut serializer = Serializer::new(rd, false, true);

    record.kv().serialize(record, &mut serializer)?;
    values.serialize(record, &mut serializer)?;

    serializer.finish()
}
