//! Deterministic doubles for the remote sources and the flag pipeline seams.
//!
//! None of these touch the network. Sources answer from in-memory tables and
//! record what they were asked for, so tests can assert on call counts.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::{self, Write};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use paises_core::Country;

use crate::connectivity::{ConnectivityError, ConnectivityProbe};
use crate::countries::{CountryFetchError, CountrySource};
use crate::flags::{FlagSource, LockProbe, RasterError, Rasteriser};
use crate::http::TransportError;

/// Bytes every [`StubRasteriser`] emits; they begin with the JPEG magic.
pub const STUB_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// A minimal document the real rasteriser accepts.
pub const STUB_SVG: &[u8] =
    br#"<svg xmlns="http://www.w3.org/2000/svg" width="3" height="2"><rect width="3" height="2" fill="green"/></svg>"#;

#[derive(Debug, Clone)]
enum Reply {
    Body(Vec<u8>),
    Status(u16),
    Hang,
}

/// [`FlagSource`] answering from a URL table.
///
/// Unknown URLs answer `404`.
#[derive(Debug, Default)]
pub struct StubFlagSource {
    replies: BTreeMap<String, Reply>,
    requests: RefCell<Vec<String>>,
}

impl StubFlagSource {
    /// Answer `url` with `body`.
    #[must_use]
    pub fn with_body(mut self, url: impl Into<String>, body: &[u8]) -> Self {
        self.replies.insert(url.into(), Reply::Body(body.to_vec()));
        self
    }

    /// Answer `url` with an HTTP error status.
    #[must_use]
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.replies.insert(url.into(), Reply::Status(status));
        self
    }

    /// Never answer `url`; the download stays pending until dropped.
    #[must_use]
    pub fn with_hang(mut self, url: impl Into<String>) -> Self {
        self.replies.insert(url.into(), Reply::Hang);
        self
    }

    /// Serve [`STUB_SVG`] for each country's flag URL.
    #[must_use]
    pub fn serving(countries: &[Country]) -> Self {
        countries
            .iter()
            .filter_map(|country| country.flag.as_deref())
            .fold(Self::default(), |source, url| source.with_body(url, STUB_SVG))
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl FlagSource for StubFlagSource {
    async fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.requests.borrow_mut().push(url.to_owned());
        match self.replies.get(url).cloned().unwrap_or(Reply::Status(404)) {
            Reply::Body(body) => {
                sink.write_all(&body)
                    .map_err(|source| TransportError::Network {
                        url: url.to_owned(),
                        source,
                    })?;
                Ok(u64::try_from(body.len()).unwrap_or(u64::MAX))
            }
            Reply::Status(status) => Err(TransportError::Http {
                url: url.to_owned(),
                status,
                message: "stubbed failure".into(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// [`LockProbe`] reporting each path locked for a fixed number of checks.
#[derive(Debug, Default)]
pub struct ScriptedLockProbe {
    locked_checks: usize,
    checks: RefCell<BTreeMap<Utf8PathBuf, usize>>,
}

impl ScriptedLockProbe {
    /// Report every path locked for its first `checks` probes.
    #[must_use]
    pub fn locked_for(checks: usize) -> Self {
        Self {
            locked_checks: checks,
            checks: RefCell::default(),
        }
    }

    /// Report every path locked indefinitely.
    #[must_use]
    pub fn always_locked() -> Self {
        Self::locked_for(usize::MAX)
    }

    /// Number of probes issued for `path`.
    #[must_use]
    pub fn checks(&self, path: &Utf8Path) -> usize {
        self.checks.borrow().get(path).copied().unwrap_or(0)
    }
}

impl LockProbe for ScriptedLockProbe {
    fn is_locked(&self, path: &Utf8Path) -> bool {
        let mut checks = self.checks.borrow_mut();
        let seen = checks.entry(path.to_owned()).or_default();
        let locked = *seen < self.locked_checks;
        *seen = seen.saturating_add(1);
        locked
    }
}

/// [`Rasteriser`] that fails on documents containing `invalid`.
///
/// Successful calls return [`STUB_JPEG`].
#[derive(Debug, Default)]
pub struct StubRasteriser {
    calls: Cell<usize>,
}

impl StubRasteriser {
    /// Number of documents handed to the rasteriser.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Rasteriser for StubRasteriser {
    fn rasterise(&self, svg: &[u8]) -> Result<Vec<u8>, RasterError> {
        self.calls.set(self.calls.get().saturating_add(1));
        if svg.windows(b"invalid".len()).any(|window| window == b"invalid") {
            return Err(RasterError::Parse(resvg::usvg::Error::NotAnUtf8Str));
        }
        Ok(STUB_JPEG.to_vec())
    }
}

/// [`CountrySource`] returning a fixed list or a fixed status failure.
#[derive(Debug, Clone)]
pub struct StubCountrySource {
    reply: Result<Vec<Country>, u16>,
}

impl StubCountrySource {
    /// Answer with `countries`.
    #[must_use]
    pub fn with_countries(countries: Vec<Country>) -> Self {
        Self {
            reply: Ok(countries),
        }
    }

    /// Answer with an HTTP error status.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self { reply: Err(status) }
    }
}

#[async_trait(?Send)]
impl CountrySource for StubCountrySource {
    async fn fetch_countries(&self) -> Result<Vec<Country>, CountryFetchError> {
        self.reply
            .clone()
            .map_err(|status| CountryFetchError::Status {
                url: "stub://countries".into(),
                status,
                message: "stubbed failure".into(),
            })
    }
}

/// [`ConnectivityProbe`] with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StubConnectivityProbe {
    online: bool,
}

impl StubConnectivityProbe {
    /// A probe that always succeeds.
    #[must_use]
    pub const fn online() -> Self {
        Self { online: true }
    }

    /// A probe that always fails.
    #[must_use]
    pub const fn offline() -> Self {
        Self { online: false }
    }
}

#[async_trait(?Send)]
impl ConnectivityProbe for StubConnectivityProbe {
    async fn check(&self) -> Result<(), ConnectivityError> {
        if self.online {
            return Ok(());
        }
        Err(ConnectivityError {
            source: TransportError::Network {
                url: "stub://probe".into(),
                source: io::Error::new(io::ErrorKind::NotConnected, "offline"),
            },
        })
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub fn block_on_for_tests<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap_or_else(|err| panic!("failed to build test runtime: {err}"))
        .block_on(future)
}
