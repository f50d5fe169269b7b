use std::sync::Arc;

use afchat_session::{
    ChannelObserver, ChatSession, CloseReason, SessionConfig, SessionEvent, SessionHandle,
};
use afchat_transport::{TlsVerification, WsConfig, WsConnector};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::cmd::resolve::live_resolver;
use crate::cmd::{runtime, WatchArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_chat, OutputFormat};

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = SessionConfig::default();
    if args.no_log {
        config = config.without_logging();
    } else if let Some(dir) = args.log_dir {
        config = config.with_log_dir(dir);
    }

    let tls = if args.verify_tls {
        TlsVerification::WebPki
    } else {
        TlsVerification::Disabled
    };
    let resolver = live_resolver(args.api_url)?;
    let connector = WsConnector::new(WsConfig { tls });
    let (observer, events) = ChannelObserver::new();
    let session = ChatSession::new(
        config,
        Arc::new(resolver),
        Arc::new(connector),
        Arc::new(observer),
    );
    let handle = session.handle();
    install_ctrlc_handler(handle.clone())?;

    let url = args.url;
    let (outcome, printed) = runtime()?.block_on(async {
        tokio::join!(
            session.run(&url),
            print_events(events, handle, args.count, format)
        )
    });

    let summary = outcome.map_err(session_error)?;
    info!(
        reason = %summary.close_reason,
        messages = summary.messages,
        printed,
        "watch finished"
    );
    if let Some(path) = &summary.log_path {
        eprintln!("Chat saved to {}", path.display());
    }

    match summary.close_reason {
        CloseReason::Stopped | CloseReason::TransportClosed => Ok(SUCCESS),
        CloseReason::ReceiveFailed => Err(CliError::new(
            TRANSPORT_ERROR,
            "chat connection failed while receiving",
        )),
    }
}

/// Print chat to stdout and status to stderr until the session ends.
async fn print_events(
    mut events: UnboundedReceiver<SessionEvent>,
    handle: SessionHandle,
    count: Option<u64>,
    format: OutputFormat,
) -> u64 {
    let mut printed = 0u64;
    let reached = |printed: u64| count.is_some_and(|limit| printed >= limit);

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Status(status) => eprintln!("{status}"),
            SessionEvent::Message(message) => {
                if reached(printed) {
                    continue;
                }
                print_chat(&message, format);
                printed += 1;
                if reached(printed) {
                    handle.stop();
                }
            }
        }
    }
    printed
}

fn install_ctrlc_handler(handle: SessionHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        handle.stop();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
