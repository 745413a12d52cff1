use crate::core::errors::{ExchangeError, SubscriptionError};
use crate::core::kernel::{Signer, WsSession};
use crate::exchanges::coindcx::channels::Channel;
use crate::exchanges::coindcx::codec::SocketIoCodec;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const JOIN_EVENT: &str = "join";
const LEAVE_EVENT: &str = "leave";

/// The set of channels the caller wants to be joined to.
///
/// Membership changes only after the corresponding frame was handed to the
/// transport, so the set always reflects what the server was told.
pub struct SubscriptionManager {
    active: BTreeSet<Channel>,
    signer: Arc<dyn Signer>,
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self {
            active: BTreeSet::new(),
            signer,
        }
    }

    pub fn contains(&self, channel: &Channel) -> bool {
        self.active.contains(channel)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.active.iter().cloned().collect()
    }

    fn join_payload(&self, channel: &Channel) -> Result<Value, ExchangeError> {
        if channel.is_authenticated() {
            let signature = self.signer.sign_channel(channel.as_str())?;
            Ok(json!({
                "channelName": channel.as_str(),
                "authSignature": signature,
                "apiKey": self.signer.api_key(),
            }))
        } else {
            Ok(json!({ "channelName": channel.as_str() }))
        }
    }

    async fn emit_join<S>(&self, session: &mut S, channel: &Channel) -> Result<(), ExchangeError>
    where
        S: WsSession<SocketIoCodec>,
    {
        let payload = self.join_payload(channel)?;
        session.emit(JOIN_EVENT, &payload).await
    }

    /// Join `channel` and record it. Re-joining a member re-sends the join.
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn subscribe<S>(
        &mut self,
        session: &mut S,
        channel: Channel,
    ) -> Result<(), ExchangeError>
    where
        S: WsSession<SocketIoCodec>,
    {
        if !session.is_connected() {
            return Err(SubscriptionError::NotConnected {
                channel: channel.to_string(),
            }
            .into());
        }

        self.emit_join(session, &channel).await?;
        info!("joined channel");
        self.active.insert(channel);
        Ok(())
    }

    /// Leave `channel`. A channel that is not a member sends nothing.
    /// `restore` puts the authenticated channel back regardless.
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn unsubscribe<S>(
        &mut self,
        session: &mut S,
        channel: &Channel,
    ) -> Result<(), ExchangeError>
    where
        S: WsSession<SocketIoCodec>,
    {
        if !session.is_connected() {
            return Err(SubscriptionError::NotConnected {
                channel: channel.to_string(),
            }
            .into());
        }

        if !self.active.contains(channel) {
            debug!("not a member, nothing to leave");
            return Ok(());
        }

        session
            .emit(LEAVE_EVENT, &json!({ "channelName": channel.as_str() }))
            .await?;
        info!("left channel");
        self.active.remove(channel);
        Ok(())
    }

    /// Re-issue every join on a fresh connection: the authenticated channel
    /// first, then each member. Returns the number of joins sent.
    ///
    /// A failure leaves the set untouched so the next connection retries it.
    #[instrument(skip_all, fields(members = self.active.len()))]
    pub async fn restore<S>(&mut self, session: &mut S) -> Result<usize, ExchangeError>
    where
        S: WsSession<SocketIoCodec>,
    {
        let auth = Channel::authenticated();
        self.emit_join(session, &auth).await?;
        self.active.insert(auth);

        let mut sent = 1;
        for channel in self.active.iter().filter(|c| !c.is_authenticated()) {
            self.emit_join(session, channel).await?;
            sent += 1;
        }

        debug!(sent, "subscriptions restored");
        Ok(sent)
    }
}
