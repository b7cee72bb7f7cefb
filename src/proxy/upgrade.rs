//! Pass-through for upgraded connections.
//!
//! When the origin answers an upgrade request with `101 Switching
//! Protocols`, both sides hand over their raw connections. [`splice`]
//! copies bytes between them until either side closes; nothing on the
//! channel is parsed.

use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

pub fn splice(client: OnUpgrade, upstream: OnUpgrade, correlation_id: String) {
    tokio::spawn(async move {
        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "connection upgrade failed"
                );
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);

        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((to_origin, to_client)) => tracing::debug!(
                correlation_id = %correlation_id,
                bytes_to_origin = to_origin,
                bytes_to_client = to_client,
                "upgraded connection closed"
            ),
            Err(e) => tracing::debug!(
                correlation_id = %correlation_id,
                error = %e,
                "upgraded connection aborted"
            ),
        }
    });
}
