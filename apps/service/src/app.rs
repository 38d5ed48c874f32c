//! Wires the engine to its consumers and drives the process until shutdown.

use std::future::Future;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener};

use actix_web::dev::ServerHandle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dashboard;
use crate::error::AppError;
use crate::monitoring::{self, ProbeResult, ResultStream};
use crate::report::{CsvFileLog, CsvLog, log_result};
use crate::status::StatusBoard;

/// Single reader of the result stream, fanning each result out to the outputs
pub struct Dispatcher<W: Write> {
    csv: Option<CsvLog<W>>,
    board: Option<StatusBoard>,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(csv: Option<CsvLog<W>>, board: Option<StatusBoard>) -> Self {
        Self { csv, board }
    }

    pub async fn dispatch(&mut self, result: ProbeResult) -> Result<(), AppError> {
        log_result(&result);

        if let Some(csv) = self.csv.as_mut() {
            csv.write_result(&result).map_err(AppError::ResultLog)?;
        }

        if let Some(board) = &self.board {
            board.update(result).await;
        }

        Ok(())
    }

    /// Consume results until the stream ends or an output fails
    pub async fn run(&mut self, stream: &mut ResultStream) -> Result<(), AppError> {
        while let Some(result) = stream.recv().await {
            self.dispatch(result).await?;
        }
        Ok(())
    }

    pub fn into_csv(self) -> Option<CsvLog<W>> {
        self.csv
    }
}

fn spawn_dashboard(
    addr: &str,
    board: StatusBoard,
) -> Result<(ServerHandle, JoinHandle<()>), AppError> {
    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr)?;

    let server = dashboard::start(listener, board)?;
    let handle = server.handle();
    let task = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Dashboard server failed: {}", e);
        }
    });

    Ok((handle, task))
}

/// Resolves when `signal` fires. If the handler could not be installed this
/// never resolves, so the monitor keeps running.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Run the monitor until Ctrl-C or until an output fails
pub async fn run(config: Config) -> Result<(), AppError> {
    let targets = config.targets()?;

    let (board, dashboard) = match config.http_addr() {
        Some(addr) => {
            let board = StatusBoard::new();
            let dashboard = spawn_dashboard(addr, board.clone())?;
            (Some(board), Some(dashboard))
        }
        None => (None, None),
    };

    let csv = config.log_path().map(CsvFileLog::create).transpose()?;

    let (mut stream, monitors) = monitoring::run(targets, config.channel_capacity)?;
    let mut dispatcher = Dispatcher::new(csv, board);

    let outcome = tokio::select! {
        outcome = dispatcher.run(&mut stream) => outcome,
        () = interrupted(tokio::signal::ctrl_c()) => Ok(()),
    };

    monitors.shutdown().await;
    if let Some((handle, task)) = dashboard {
        handle.stop(true).await;
        if let Err(e) = task.await {
            warn!("Dashboard task did not finish cleanly: {}", e);
        }
    }

    outcome
}
