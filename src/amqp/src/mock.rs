//! In-memory stand-in for a broker channel.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use futures::{future::BoxFuture, FutureExt};
use lapin::{publisher_confirm::Confirmation, BasicProperties};

use crate::{PublishChannel, PERSISTENT};

/// How the mock broker answers a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Ack,
    Nack,
    /// Accepts the frames but never confirms them.
    Stall,
    /// Fails the publish with a transport error; the channel stays usable.
    Fail,
    /// The broker has closed the channel; every publish fails.
    ChannelClosed,
}

#[derive(Debug, Clone)]
pub struct Received {
    pub exchange: String,
    pub routing_key: String,
    pub properties: BasicProperties,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct MockChannel {
    inner: Arc<Inner>,
}

struct Inner {
    behaviour: Mutex<Behaviour>,
    received: Mutex<Vec<Received>>,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    closed: AtomicBool,
}

impl MockChannel {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            inner: Arc::new(Inner {
                behaviour: Mutex::new(behaviour),
                received: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                overlaps: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.inner.behaviour.lock().unwrap() = behaviour;
    }

    /// Every message whose frames reached the broker, acked or not.
    pub fn received(&self) -> Vec<Received> {
        self.inner.received.lock().unwrap().clone()
    }

    /// Number of `basic_publish` calls that started while another was running.
    pub fn overlapping_publishes(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PublishChannel for MockChannel {
    type Confirm = BoxFuture<'static, lapin::Result<Confirmation>>;

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        properties: BasicProperties,
    ) -> lapin::Result<Self::Confirm> {
        if self.inner.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.inner.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let _in_flight = InFlight(&self.inner.in_flight);

        // Give other publishers a chance to run mid-frame.
        tokio::task::yield_now().await;

        let behaviour = *self.inner.behaviour.lock().unwrap();
        match behaviour {
            Behaviour::Fail => {
                return Err(lapin::Error::IOError(Arc::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "mock broker dropped the frame",
                ))));
            }
            Behaviour::ChannelClosed => {
                return Err(lapin::Error::IOError(Arc::new(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "mock broker closed the channel",
                ))));
            }
            _ => {}
        }

        assert_eq!(
            properties.delivery_mode(),
            &Some(PERSISTENT),
            "message published without persistent delivery"
        );

        self.inner.received.lock().unwrap().push(Received {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties,
            body: payload.to_vec(),
        });

        let confirm = match behaviour {
            Behaviour::Ack => futures::future::ready(Ok(Confirmation::Ack(None))).boxed(),
            Behaviour::Nack => futures::future::ready(Ok(Confirmation::Nack(None))).boxed(),
            _ => futures::future::pending().boxed(),
        };
        Ok(confirm)
    }

    async fn close(&self) -> lapin::Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.is_closed() && *self.inner.behaviour.lock().unwrap() != Behaviour::ChannelClosed
    }
}
