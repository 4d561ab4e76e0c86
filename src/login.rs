// MIT License - Copyright (c) 2026 Peter Wright
// Network bridge login handshake

//! Envisalink-style bridges open every connection with `505` status `3`
//! (password request). The reply is `005<password>`; the bridge answers
//! with `505` status `1` (accepted) or `0` (rejected, socket dropped).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::FailureCause;
use crate::protocol::{InboundCommand, LoginStatus, OutboundCommand};
use crate::session::SessionShared;
use crate::transport::writer::OutboundQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    PasswordSent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAction {
    None,
    SendPassword(OutboundCommand),
    Accepted,
    Rejected,
    TimedOut,
}

/// Login state machine. Exactly one password submission per prompt.
#[derive(Debug, Clone)]
pub struct LoginHandler {
    password: String,
    state: LoginState,
    prompts: u32,
}

impl LoginHandler {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            state: LoginState::Idle,
            prompts: 0,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Number of prompts answered so far.
    pub fn prompts(&self) -> u32 {
        self.prompts
    }

    pub fn handle(&mut self, command: &InboundCommand) -> LoginAction {
        match command.login_status() {
            Some(LoginStatus::PasswordRequest) => {
                if self.state == LoginState::PasswordSent {
                    debug!("Login re-prompted, sending password again");
                }
                self.state = LoginState::PasswordSent;
                self.prompts += 1;
                LoginAction::SendPassword(OutboundCommand::network_login(self.password.clone()))
            }
            Some(LoginStatus::Success) => LoginAction::Accepted,
            Some(LoginStatus::Failed) => LoginAction::Rejected,
            Some(LoginStatus::TimedOut) => LoginAction::TimedOut,
            None => LoginAction::None,
        }
    }
}

/// Drive the handshake from the login interaction commands the reader
/// forwards.
pub(crate) async fn run(
    mut commands: mpsc::UnboundedReceiver<InboundCommand>,
    password: String,
    outbound: OutboundQueue,
    shared: Arc<SessionShared>,
) {
    let mut handler = LoginHandler::new(password);

    loop {
        let command = tokio::select! {
            biased;
            _ = shared.stopped() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match handler.handle(&command) {
            LoginAction::None => {}
            LoginAction::SendPassword(login) => {
                info!("Bridge requested password, logging in");
                if outbound.submit(login).is_err() {
                    break;
                }
            }
            LoginAction::Accepted => {
                info!("Login accepted");
                shared.mark_ready();
            }
            LoginAction::Rejected => {
                shared.fail(FailureCause::LoginRejected);
                break;
            }
            LoginAction::TimedOut => {
                warn!("Bridge reports login timed out");
            }
        }
    }
    debug!("Login handler stopped");
}
