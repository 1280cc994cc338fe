use futures::{FutureExt as _, future::BoxFuture};
use grouplay_core::{PlayRequest, Player, PlayerError};

/// A player with no audio output. It reports what it would play.
pub struct LogPlayer;
impl Player for LogPlayer {
    fn play(&self, request: PlayRequest) -> BoxFuture<'_, Result<(), PlayerError>> {
        async move {
            tracing::info!(
                "Play {} at position {} (offset {:?})",
                request.uri,
                request.position,
                request.offset
            );
            Ok(())
        }
        .boxed()
    }
}
