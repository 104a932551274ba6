use std::time::Duration;

use clap::{Parser, Subcommand};

use testandset::acquire::{self, LockRequest};
use testandset::api::{self, Api, MutexService, RefreshOutcome};
use testandset::error::Error;
use testandset::output::{self, OutputMode};
use testandset::pacer::SystemPacer;
use testandset::session::{self, Session};
use testandset::trace;

#[derive(Parser, Debug)]
#[command(
    name = "testandset",
    about = "Coordinate exclusive execution across processes through named mutexes hosted by the TestAndSet service"
)]
struct Cli {
    /// URL of the API endpoint
    #[arg(
        short = 'e',
        long,
        global = true,
        default_value = api::DEFAULT_ENDPOINT
    )]
    endpoint: String,

    /// Enable verbose mode
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lock a mutex, optionally retrying while someone else holds it
    Lock {
        /// Name of the mutex
        #[arg(short = 'n', long)]
        name: String,

        /// Owner of the mutex (visible to everyone knowing the mutex name)
        #[arg(short = 'O', long)]
        owner: Option<String>,

        /// Seconds to keep retrying when the mutex is already locked
        #[arg(short = 't', long, default_value_t = 0)]
        timeout: u64,

        /// Formats the output
        #[arg(short = 'o', long, value_enum, default_value = "json")]
        output: OutputMode,

        /// Keep the acquired mutex refreshed until interrupted
        #[arg(long)]
        auto_refresh: bool,
    },

    /// Show the current state of a mutex
    Get {
        /// Name of the mutex
        #[arg(short = 'n', long)]
        name: String,
    },

    /// Refresh a held mutex once
    Refresh {
        /// Name of the mutex
        #[arg(short = 'n', long)]
        name: String,

        /// Token for manipulating an existing mutex
        #[arg(short = 't', long)]
        token: String,
    },

    /// Release a held mutex
    Unlock {
        /// Name of the mutex
        #[arg(short = 'n', long)]
        name: String,

        /// Token for manipulating an existing mutex
        #[arg(short = 't', long)]
        token: String,
    },

    /// Keep a held mutex refreshed until it is denied or the process is interrupted
    AutoRefresh {
        /// Name of the mutex
        #[arg(short = 'n', long)]
        name: String,

        /// Token for manipulating an existing mutex
        #[arg(short = 't', long)]
        token: String,
    },
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        trace::enable();
    }
    if let Err(err) = run(cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let api = Api::new(cli.endpoint);

    match cli.command {
        Command::Lock {
            name,
            owner,
            timeout,
            output,
            auto_refresh,
        } => {
            let request = LockRequest {
                name,
                owner,
                timeout: Duration::from_secs(timeout),
            };
            let result = acquire::acquire(&api, &request, &mut SystemPacer)?;
            println!("{}", output::render(&result, output)?);

            if auto_refresh {
                let token = result.answer()?.token;
                let session = Session {
                    name: request.name,
                    token,
                };
                return Err(session::hold(api, session));
            }
            Ok(())
        }

        Command::Get { name } => {
            println!("{}", api.inspect(&name)?);
            Ok(())
        }

        Command::Refresh { name, token } => {
            // Single-shot refresh prints whatever the service answered,
            // denied or not; only the auto-refresh loop acts on the status.
            match api.refresh(&name, &token)? {
                RefreshOutcome::Refreshed(result) => println!("{}", result.raw),
                RefreshOutcome::Denied(body) => println!("{body}"),
            }
            Ok(())
        }

        Command::Unlock { name, token } => {
            println!("{}", api.release(&name, &token)?);
            Ok(())
        }

        Command::AutoRefresh { name, token } => Err(session::hold(api, Session { name, token })),
    }
}
