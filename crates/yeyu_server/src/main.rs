use log::{error, info};
use std::process::ExitCode;
use yeyu_core::{init_logging, open_db, AppConfig, LoggingOptions};
use yeyu_server::build_router;
use yeyu_server::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("yeyu-server: {err}");
            return ExitCode::FAILURE;
        }
    };

    match config.log_dir.as_deref() {
        Some(log_dir) => {
            let options = LoggingOptions {
                level: &config.log_level,
                log_dir,
                echo_stderr: true,
            };
            if let Err(err) = init_logging(&options) {
                eprintln!("yeyu-server: logging disabled: {err}");
            }
        }
        None => eprintln!("yeyu-server: YEYU_LOG_DIR unset, file logging disabled"),
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=server_exit module=server status=error error={message}");
            eprintln!("yeyu-server: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), String> {
    // Apply migrations before accepting requests.
    open_db(&config.db_path).map_err(|err| err.to_string())?;

    let bind_addr = config.bind_addr;
    let state = AppState::new(config).map_err(|err| err.to_string())?;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|err| format!("cannot bind {bind_addr}: {err}"))?;

    info!("event=server_start module=server status=ok addr={bind_addr}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("event=server_stop module=server status=start");
        })
        .await
        .map_err(|err| err.to_string())?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}
