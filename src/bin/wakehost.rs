use wakehost::host;
use wakehost::server;
use wakehost::service;
use wakehost::wol;

use clap::{Parser, Subcommand};
use host::{Change, Host, HostBook};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use wol::Dispatcher;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Json file holding the stored hosts.
    #[arg(long, env = "WAKEHOST_HOSTS", default_value = "hosts.json")]
    hosts_file: PathBuf,

    /// How many times each magic packet is sent.
    #[arg(long, env = "WAKEHOST_ATTEMPTS", default_value_t = service::DEFAULT_ATTEMPTS)]
    attempts: u32,

    /// Give up opening a socket after this many milliseconds.
    #[arg(long, default_value_t = 3000)]
    open_timeout_ms: u64,

    /// If true, log packets instead of sending them.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Addressing {
    /// Broadcast or unicast address, 255.255.255.255 if unset.
    #[arg(long)]
    broadcast: Option<String>,

    /// UDP port, 9 if unset.
    #[arg(long)]
    port: Option<i64>,

    /// SecureOn password, in xx:xx:xx:xx:xx:xx or a.b.c.d form.
    #[arg(long)]
    secure_on: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wake a MAC address that isn't in the host book.
    Wake {
        /// MAC address, in xx:xx:xx:xx:xx:xx or xx-xx-xx-xx-xx-xx form.
        mac_address: String,
        #[command(flatten)]
        addressing: Addressing,
    },
    /// Wake a stored host by title.
    WakeHost { title: String },
    /// List stored hosts.
    List,
    /// Add a host, or replace the one with the same title.
    Add {
        title: String,
        mac_address: String,
        #[command(flatten)]
        addressing: Addressing,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a stored host.
    Remove { title: String },
    /// Serve the host book over http.
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        http_addr: String,
    },
}

fn host_from_args(title: String, mac_address: String, addressing: Addressing) -> Host {
    Host {
        broadcast_address: addressing.broadcast,
        port: addressing.port,
        secure_on: addressing.secure_on,
        ..Host::new(title, mac_address)
    }
}

// Exit code 2 means the host entry needs fixing, 1 that the network failed.
fn wake(waker: &service::Waker, host: &Host) -> ExitCode {
    match waker.wake(host) {
        Ok(sent) => {
            println!(
                "Sent magic packet to {} ({} of {} attempts accepted).",
                host.title, sent.accepted, sent.attempts
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_input_error() => {
            eprintln!("Check the host entry: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Network problem, try again: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("INFO"))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    let transport: Arc<dyn wol::Transport> = if args.dry_run {
        Arc::new(wol::noop::LogOnlyTransport)
    } else {
        Arc::new(wol::udp::UdpTransport::new(Duration::from_millis(
            args.open_timeout_ms,
        )))
    };
    let waker = service::Waker::new(Dispatcher::new(transport), args.attempts);

    match args.command {
        Command::Wake {
            mac_address,
            addressing,
        } => {
            let host = host_from_args(mac_address.clone(), mac_address, addressing);
            Ok(wake(&waker, &host))
        }
        Command::WakeHost { title } => {
            let book = HostBook::load(&args.hosts_file)?;
            match book.get(&title) {
                Some(host) => Ok(wake(&waker, host)),
                None => {
                    eprintln!("No host named {:?} in {}", title, args.hosts_file.display());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::List => {
            let book = HostBook::load(&args.hosts_file)?;
            for host in book.hosts() {
                let destination = match host.wake_target() {
                    Ok(target) => target.destination.to_string(),
                    Err(e) => format!("invalid: {}", e),
                };
                println!("{}\t{}\t{}", host.title, host.mac_address, destination);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Add {
            title,
            mac_address,
            addressing,
            icon,
        } => {
            let mut book = HostBook::load(&args.hosts_file)?;
            let host = Host {
                icon_name: icon,
                ..host_from_args(title, mac_address, addressing)
            };
            let title = host.title.clone();
            let change = book.upsert(host)?;
            book.save(&args.hosts_file)?;
            match change {
                Change::Inserted => info!("Added {:?}", title),
                Change::Updated => info!("Updated {:?}", title),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { title } => {
            let mut book = HostBook::load(&args.hosts_file)?;
            if book.remove(&title).is_none() {
                eprintln!("No host named {:?} in {}", title, args.hosts_file.display());
                return Ok(ExitCode::FAILURE);
            }
            book.save(&args.hosts_file)?;
            info!("Removed {:?}", title);
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { http_addr } => server::serve(
            &http_addr,
            server::AppState {
                book_path: args.hosts_file,
                waker,
            },
        ),
    }
}
