use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use requester_core::app::CoordinatorBuilder;
use requester_core::config::WorkerConfig;
use requester_core::observability::init_tracing;

/// web-requester: performs one HTTP request handed over pub/sub, then exits
#[derive(Debug, Parser)]
#[command(name = "web-requester", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,

    /// Overall timeout for the outgoing HTTP request, in seconds
    #[arg(long = "request-timeout-secs")]
    request_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    // 設定は環境変数から一度だけ読む
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    let mut coordinator = match CoordinatorBuilder::new(config)
        .request_timeout(cli.request_timeout_secs.map(Duration::from_secs))
        .build_redis()
    {
        Ok(coordinator) => coordinator,
        Err(err) => {
            error!(error = %err, "failed to build worker");
            return ExitCode::FAILURE;
        }
    };

    // 失敗した HTTP 呼び出しは envelope として publish 済みなので正常終了
    match coordinator.run().await {
        Ok(envelope) => {
            info!(
                run_id = %coordinator.run_id(),
                kind = envelope.kind(),
                dropped = coordinator.dropped_messages(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, phase = %coordinator.phase(), "worker aborted");
            ExitCode::FAILURE
        }
    }
}
