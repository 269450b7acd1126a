use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::bail;
use cop1_core::Clcw;
use tokio::{spawn, sync::Mutex, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::FopEngine;

/// The FOP engines of one spacecraft uplink, keyed by virtual channel
///
/// The uplink routes CLCWs from the return link to the engine of the virtual channel they
/// report on.
///
/// # Examples
///
/// ```
/// use cop1_core::{Clcw, FopConfig, FopDirective, SharedCounter, TransferFrame};
/// use cop1_tokio::{FopEngine, Uplink};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let uplink = Uplink::new();
///     let engine = FopEngine::spawn(
///         FopConfig { vcid: 2, ..FopConfig::default() },
///         SharedCounter::new(0),
///         |_frame: &TransferFrame| true,
///     )?;
///     uplink.add(engine.clone()).await?;
///
///     engine.directive(1, FopDirective::InitAdWithoutClcw)?;
///     engine.transmit_frame(TransferFrame::ad(vec![0x01, 0x02]))?;
///     assert!(uplink.deliver_clcw(Clcw::cop1(2, 1)).await?);
///     assert!(!uplink.deliver_clcw(Clcw::cop1(3, 0)).await?);
///
///     uplink.dispose_all().await;
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Uplink {
    engines: Arc<Mutex<HashMap<u8, FopEngine>>>,
}

impl Uplink {
    /// Creates an uplink without engines
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the engine of a virtual channel
    ///
    /// # Errors
    ///
    /// Returns an error if an engine is already registered for the channel.
    pub async fn add(&self, engine: FopEngine) -> anyhow::Result<()> {
        let mut engines = self.engines.lock().await;
        if engines.contains_key(&engine.vcid()) {
            bail!("an engine for VC {} is already registered", engine.vcid());
        }
        info!("adding engine for VC {}", engine.vcid());
        engines.insert(engine.vcid(), engine);
        Ok(())
    }

    /// Returns a handle to the engine of a virtual channel
    pub async fn engine(&self, vcid: u8) -> Option<FopEngine> {
        self.engines.lock().await.get(&vcid).cloned()
    }

    /// Routes a CLCW to the engine of its virtual channel
    ///
    /// Returns `false` if no engine serves that channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    pub async fn deliver_clcw(&self, clcw: Clcw) -> anyhow::Result<bool> {
        let Some(engine) = self.engine(clcw.vcid).await else {
            debug!("no engine for VC {}, dropping CLCW", clcw.vcid);
            return Ok(false);
        };
        engine.clcw(clcw)?;
        Ok(true)
    }

    /// Disposes and removes every engine
    pub async fn dispose_all(&self) {
        let engines: Vec<_> = self.engines.lock().await.drain().collect();
        for (vcid, engine) in engines {
            if let Err(e) = engine.dispose().await {
                warn!("VC {vcid}: {e}");
            }
        }
    }

    /// Periodically logs the status of every engine
    pub fn monitor(&self, period: Duration) -> JoinHandle<()> {
        let engines = self.engines.clone();
        spawn(async move {
            loop {
                sleep(period).await;
                let engines: Vec<_> = engines.lock().await.values().cloned().collect();
                for engine in engines {
                    match engine.status().await {
                        Ok(status) => info!("VC {}: {status:?}", engine.vcid()),
                        Err(e) => warn!("VC {}: {e}", engine.vcid()),
                    }
                }
            }
        })
    }

    /// Creates a new reference to the engine [`HashMap`]
    #[must_use]
    pub fn engines(&self) -> Arc<Mutex<HashMap<u8, FopEngine>>> {
        self.engines.clone()
    }
}
