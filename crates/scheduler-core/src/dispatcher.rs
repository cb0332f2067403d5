use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::invocation::{Invocation, InvocationMethod};

/// Runs the single-threaded dispatcher loop: consumes ready invocations and
/// performs the outbound HTTP call. Never retries and never feeds a
/// response back into the event queue — both are explicit non-goals of the
/// design.
pub async fn run_dispatcher_loop(
    mut dispatch_rx: mpsc::Receiver<Invocation>,
    client: reqwest::Client,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("dispatcher loop draining remaining invocations before shutdown");
                while let Ok(invocation) = dispatch_rx.try_recv() {
                    dispatch_one(&client, invocation).await;
                }
                break;
            }

            invocation = dispatch_rx.recv() => {
                match invocation {
                    Some(invocation) => dispatch_one(&client, invocation).await,
                    None => {
                        info!("dispatch queue closed, dispatcher loop exiting");
                        break;
                    }
                }
            }
        }
    }
}

async fn dispatch_one(client: &reqwest::Client, invocation: Invocation) {
    if invocation.mock {
        info!(
            function = %invocation.function_name,
            url = %invocation.url,
            method = invocation.method.as_str(),
            "mock invocation, not sending"
        );
        return;
    }

    let method = reqwest_method(invocation.method);
    let mut request = client.request(method, &invocation.url);

    // Legacy compatibility quirk: GET invocations never carry a JSON body,
    // even when the argument map is non-empty.
    if invocation.method == InvocationMethod::Get {
        if !invocation.arguments.is_empty() {
            warn!(
                function = %invocation.function_name,
                "dropping non-empty argument map on a GET invocation"
            );
        }
    } else {
        request = request.json(&invocation.arguments);
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if status >= 300 {
                warn!(
                    function = %invocation.function_name,
                    status,
                    "invocation returned a non-success status"
                );
            }
            info!(function = %invocation.function_name, "invocation dispatched");
        }
        Err(err) => {
            tracing::error!(
                function = %invocation.function_name,
                error = %err,
                "invocation failed"
            );
        }
    }
}

fn reqwest_method(method: InvocationMethod) -> reqwest::Method {
    match method {
        InvocationMethod::Get => reqwest::Method::GET,
        InvocationMethod::Post => reqwest::Method::POST,
        InvocationMethod::Put => reqwest::Method::PUT,
        InvocationMethod::Patch => reqwest::Method::PATCH,
        InvocationMethod::Delete => reqwest::Method::DELETE,
    }
}

pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}
