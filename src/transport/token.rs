//! Completion handles for asynchronous transport requests

use tokio::sync::oneshot;

use super::TransportError;

/// Handle to a queued transport request
///
/// Awaiting [`Token::wait`] is optional; dropping the token leaves the
/// request running (fire-and-forget).
#[derive(Debug)]
pub struct Token {
    state: TokenState,
}

#[derive(Debug)]
enum TokenState {
    Ready(Result<(), TransportError>),
    Pending(oneshot::Receiver<Result<(), TransportError>>),
}

/// Sending half of a pending [`Token`]
#[derive(Debug)]
pub struct TokenCompleter {
    tx: oneshot::Sender<Result<(), TransportError>>,
}

impl Token {
    /// Token for a request whose outcome is already known
    pub fn ready(result: Result<(), TransportError>) -> Self {
        Self {
            state: TokenState::Ready(result),
        }
    }

    /// Token resolved later through the returned completer
    pub fn pending() -> (TokenCompleter, Self) {
        let (tx, rx) = oneshot::channel();
        (
            TokenCompleter { tx },
            Self {
                state: TokenState::Pending(rx),
            },
        )
    }

    /// Wait for the request to finish
    pub async fn wait(self) -> Result<(), TransportError> {
        match self.state {
            TokenState::Ready(result) => result,
            TokenState::Pending(rx) => rx.await.unwrap_or(Err(TransportError::Abandoned)),
        }
    }
}

impl TokenCompleter {
    pub fn complete(self, result: Result<(), TransportError>) {
        // The waiter may have dropped its token
        let _ = self.tx.send(result);
    }
}
