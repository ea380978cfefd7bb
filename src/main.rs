use clap::Parser;
use clap_num::maybe_hex;
use std::path::PathBuf;
use std::process::ExitCode;
use tspid::format::ts::types::PID_MAX;
use tspid::format::ts::TSSource;
use tspid::{Config, TsError};

#[derive(Debug, Parser)]
#[clap(name = "tspid")]
#[clap(about = "Lists the PIDs of an MPEG transport stream file or extracts one of them.", long_about = None)]
#[clap(version)]
struct Cli {
    /// Input transport stream file.
    #[clap(long = "in", value_name = "FILE")]
    input: PathBuf,

    /// PID to extract, decimal or 0x-prefixed hex.{n}
    /// Without --pid or --all the PIDs are listed.
    #[clap(long, value_parser = parse_pid, conflicts_with = "all")]
    pid: Option<u16>,

    /// Output file for --pid.{n}
    /// Defaults to Pid_0x<pid>_<input name> next to the input.
    #[clap(long, value_name = "FILE", requires = "pid")]
    out: Option<PathBuf>,

    /// Extract every PID in parallel.
    #[clap(long)]
    all: bool,

    /// Output directory for --all.
    #[clap(long, value_name = "DIR", requires = "all")]
    out_dir: Option<PathBuf>,

    /// Keep packets in memory during the scan instead of re-reading them.
    #[clap(long)]
    retain_packets: bool,

    /// Validate the packet stride over the first N packets only.
    #[clap(long, value_name = "N")]
    probe_packets: Option<u64>,
}

fn parse_pid(s: &str) -> Result<u16, String> {
    let pid = maybe_hex::<u16>(s)?;
    if pid > PID_MAX {
        return Err(format!("PID must be at most 0x{:04X}", PID_MAX));
    }
    Ok(pid)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {
            println!("tspid: Ok");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("tspid: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> tspid::Result<()> {
    let mut config = Config::load();
    if cli.retain_packets {
        config = config.with_retain_packet_bytes(true);
    }
    if let Some(limit) = cli.probe_packets {
        config = config.with_probe_packet_limit(Some(limit));
    }

    let mut source = TSSource::open_with_config(&cli.input, config)?;
    source.parse()?;

    if cli.all {
        let pids: Vec<u16> = source.index().pids().collect();
        for path in source.extract_pids(&pids, cli.out_dir.as_deref()).await? {
            println!("Wrote {}", path.display());
        }
    } else if let Some(pid) = cli.pid {
        match source.extract_pid(pid, cli.out.as_deref()) {
            Ok(path) => println!("Pid 0x{:04X} [{}] written to {}", pid, pid, path.display()),
            Err(TsError::PidNotFound(pid)) => {
                println!("No Pid: 0x{:04X} [{}] in the stream.", pid, pid);
                return Err(TsError::PidNotFound(pid));
            }
            Err(e) => return Err(e),
        }
    } else {
        print_listing(&source);
    }

    Ok(())
}

fn print_listing(source: &TSSource) {
    if let Some(report) = source.probe_report() {
        println!(
            "Packet size: {} (first packet at offset {})",
            report.packet_size, report.first_packet
        );
        println!("Strides:");
        for (stride, count) in &report.stride_histogram {
            println!("    {:5} x {}", stride, count);
        }
    }

    let stats = source.scan_stats();
    if stats.resyncs > 0 {
        println!(
            "Resynchronized {} times, {} bytes skipped",
            stats.resyncs, stats.skipped_bytes
        );
    }

    let pids = source.list_pids();
    println!("List of pids ({})", pids.len());
    for entry in pids {
        println!("    0x{:04X} [{:4}] - {}", entry.pid, entry.pid, entry.packet_count);
    }
}
