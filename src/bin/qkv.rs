#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate slog_global;

use std::path::Path;
use std::process;

use clap::{App, Arg, ArgMatches};

use hpaxos::conf::{ClusterInfo, ConfError};
use hpaxos::proto::ReplicaId;
use qkv::setup::init_logger;
use qkv::{Server, ServerError};

quick_error! {
    #[derive(Debug)]
    enum CliError {
        BadArg(name: &'static str, v: String) {
            display("invalid value for --{}: {:?}", name, v)
        }
        Conf(e: ConfError) {
            from()
            display("cluster config: {:?}", e)
        }
        IO(e: std::io::Error) {
            from()
            display("io: {}", e)
        }
        Server(e: ServerError) {
            from()
            display("{}", e)
        }
    }
}

fn bool_arg(m: &ArgMatches, name: &'static str) -> Result<Option<bool>, CliError> {
    match m.value_of(name) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(v) => Err(CliError::BadArg(name, v.to_owned())),
    }
}

async fn run(m: ArgMatches<'_>) -> Result<(), CliError> {
    let id = m.value_of("id").unwrap_or("0");
    let replica_id: ReplicaId = id
        .parse()
        .map_err(|_| CliError::BadArg("id", id.to_owned()))?;

    let log = m
        .value_of("log")
        .map(|s| s.to_owned())
        .unwrap_or_else(|| format!("qkv-{}.log", replica_id));
    init_logger(&log, replica_id)?;

    let mut cluster = ClusterInfo::from_file(m.value_of("cluster").unwrap_or("cluster.yaml"))?;
    if let Some(v) = bool_arg(&m, "exec")? {
        cluster.replica.exec = v;
    }
    if let Some(v) = bool_arg(&m, "dreply")? {
        cluster.replica.dreply = v;
    }
    if let Some(v) = bool_arg(&m, "durable")? {
        cluster.replica.durable = v;
    }

    let mut server = Server::new(cluster, replica_id)?;
    let wal = server.open_wal(m.value_of("wal").map(Path::new))?;
    server.start(wal)?;

    tokio::signal::ctrl_c().await?;
    info!("interrupted, stopping replica {}", replica_id);

    server.stop()?;
    server.join().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = App::new("qkv")
        .version("0.1.0")
        .author("openacid")
        .about("replicated key-value register over redis protocol")
        .arg(
            Arg::with_name("cluster")
                .long("cluster")
                .takes_value(true)
                .required(true)
                .help("cluster config in yaml"),
        )
        .arg(
            Arg::with_name("id")
                .long("id")
                .takes_value(true)
                .required(true)
                .help("replica id of this server. It must be one key of cluster.replicas"),
        )
        .arg(
            Arg::with_name("exec")
                .long("exec")
                .takes_value(true)
                .help("true|false: execute committed commands"),
        )
        .arg(
            Arg::with_name("dreply")
                .long("dreply")
                .takes_value(true)
                .help("true|false: reply to rmw clients after execution instead of at commit"),
        )
        .arg(
            Arg::with_name("durable")
                .long("durable")
                .takes_value(true)
                .help("true|false: write ahead to stable storage"),
        )
        .arg(
            Arg::with_name("wal")
                .long("wal")
                .takes_value(true)
                .help("path of the write-ahead log, default qkv-<id>.wal"),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .help("path of the log file, default qkv-<id>.log"),
        )
        .get_matches();

    if let Err(e) = run(matches).await {
        eprintln!("qkv: {}", e);
        process::exit(1);
    }
}
