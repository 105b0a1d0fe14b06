//! Client orchestration: live fan-in and historical loading.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, NaiveDate, Utc};
use futures::Stream;
use sbpro_archive::{ArchiveSource, TcpArchiveSource, TickArchive};
use sbpro_catalog::Catalog;
use sbpro_types::{Contract, Symbol, Tick};
use sbpro_wire::bulk::request_catalog;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info};

use crate::logging::{self, LogSink};
use crate::session::{SessionExit, SessionOptions, StreamingSession};
use crate::{ClientConfig, ClientError, Result};

/// Client of the sbpro feed.
///
/// Owns the symbol catalog, the archive cache, and the log sinks. The
/// catalog is read-only after construction.
#[derive(Debug)]
pub struct Client<S = TcpArchiveSource> {
    key: String,
    config: ClientConfig,
    catalog: Catalog,
    archive: TickArchive<S>,
    sinks: Vec<LogSink>,
    dispatch: Dispatch,
}

impl Client {
    /// Fetches the catalog from the configured catalog server and creates a
    /// client without log sinks.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched or parsed, or the
    /// configured log level is invalid.
    pub async fn connect(key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Self::builder(key, config).connect().await
    }

    /// Starts building a client.
    #[must_use]
    pub fn builder(key: impl Into<String>, config: ClientConfig) -> ClientBuilder {
        let source = TcpArchiveSource::new(config.archive_server.clone());
        ClientBuilder {
            key: key.into(),
            config,
            sinks: Vec::new(),
            source,
        }
    }
}

impl<S: ArchiveSource> Client<S> {
    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the symbol catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the archive cache.
    #[must_use]
    pub const fn archive(&self) -> &TickArchive<S> {
        &self.archive
    }

    /// Looks up a catalogued symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownSymbol`] if the name is not catalogued.
    pub fn symbol(&self, name: &str) -> Result<&Symbol> {
        self.catalog
            .get(name)
            .ok_or_else(|| ClientError::UnknownSymbol(name.to_string()))
    }

    /// Streams live ticks of the most recent contracts of a symbol.
    ///
    /// One [`StreamingSession`] runs per contract, all feeding the returned
    /// stream. Sessions reconnect on their own, so the stream only ends
    /// after [`LiveStream::cancel`] or [`LiveStream::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is unknown, has a non-positive tick
    /// cost, or has no contracts.
    pub async fn stream_live(&self, name: &str) -> Result<LiveStream> {
        tracing::dispatcher::with_default(&self.dispatch, || self.start_live(name))
    }

    fn start_live(&self, name: &str) -> Result<LiveStream> {
        let symbol = self.symbol(name)?;
        if !symbol.is_streamable() {
            return Err(ClientError::InvalidTickCost {
                symbol: symbol.name().to_string(),
                tick_cost: symbol.tick_cost(),
            });
        }
        let contracts = symbol
            .latest_contracts(self.config.contracts_per_symbol)?
            .to_vec();

        info!(
            symbol = name,
            contracts = %join_contracts(&contracts),
            "starting live sessions"
        );

        let (tx, rx) = mpsc::channel(self.config.channel_capacity());
        let shutdown = CancellationToken::new();
        let options = Arc::new(SessionOptions::from_config(&self.config, self.key.clone()));

        let mut sessions = JoinSet::new();
        for &contract in &contracts {
            let mut session = StreamingSession::new(
                symbol,
                contract,
                Arc::clone(&options),
                tx.clone(),
                shutdown.clone(),
            );
            let dispatch = self.dispatch.clone();
            sessions.spawn(async move { session.run().await }.with_subscriber(dispatch));
        }
        // The channel closes once the last session drops its sender.
        drop(tx);

        let coordinator =
            tokio::spawn(coordinate(sessions).with_subscriber(self.dispatch.clone()));

        Ok(LiveStream {
            receiver: rx,
            contracts,
            shutdown: shutdown.clone(),
            coordinator,
            _cancel_on_drop: shutdown.drop_guard(),
        })
    }

    /// Loads the trading day of `as_of` for every catalogued symbol.
    ///
    /// Symbols are visited in name order and each contributes the ticks of
    /// its most recent contracts. The first failure aborts the load.
    ///
    /// # Errors
    ///
    /// Returns an error naming the symbol whose contracts or archive failed.
    pub async fn load_history(&self, as_of: DateTime<Utc>) -> Result<Vec<Tick>> {
        let date = self.archive.trading_date(&as_of);
        async {
            let mut ticks = Vec::new();
            for symbol in self.catalog.sorted() {
                ticks.extend(self.symbol_history(symbol, date).await?);
            }
            info!(count = ticks.len(), %date, "history loaded");
            Ok(ticks)
        }
        .with_subscriber(self.dispatch.clone())
        .await
    }

    /// Loads the trading day of `as_of` for one symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is unknown or its history fails.
    pub async fn history_for(&self, name: &str, as_of: DateTime<Utc>) -> Result<Vec<Tick>> {
        let symbol = self.symbol(name)?;
        let date = self.archive.trading_date(&as_of);
        self.symbol_history(symbol, date)
            .with_subscriber(self.dispatch.clone())
            .await
    }

    async fn symbol_history(&self, symbol: &Symbol, date: NaiveDate) -> Result<Vec<Tick>> {
        let contracts = symbol.latest_contracts(self.config.contracts_per_symbol)?;
        info!(symbol = symbol.name(), %date, "loading history");

        let mut ticks = Vec::new();
        for contract in contracts {
            let contract = contract.to_string();
            let day = self
                .archive
                .get_ticks(date, symbol, &contract)
                .await
                .map_err(|source| ClientError::History {
                    symbol: symbol.name().to_string(),
                    source,
                })?;
            if day.is_empty() {
                info!(symbol = symbol.name(), %contract, "no data on server");
            }
            ticks.extend(day);
        }
        Ok(ticks)
    }

    /// Flushes every log sink and closes the ones created with [`LogSink::owned`].
    ///
    /// # Errors
    ///
    /// Returns the first sink error. Every sink is attempted regardless.
    pub fn close(&self) -> Result<()> {
        tracing::dispatcher::with_default(&self.dispatch, || {
            info!(sinks = self.sinks.len(), "closing client");
        });

        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.shutdown() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), |e| Err(ClientError::LogSink(e)))
    }
}

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder<S = TcpArchiveSource> {
    key: String,
    config: ClientConfig,
    sinks: Vec<LogSink>,
    source: S,
}

impl<S: ArchiveSource> ClientBuilder<S> {
    /// Adds a log sink.
    #[must_use]
    pub fn sink(mut self, sink: LogSink) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replaces the source consulted on archive cache misses.
    #[must_use]
    pub fn archive_source<T: ArchiveSource>(self, source: T) -> ClientBuilder<T> {
        ClientBuilder {
            key: self.key,
            config: self.config,
            sinks: self.sinks,
            source,
        }
    }

    /// Creates the client with a caller-supplied catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured log level is invalid.
    pub fn build(self, catalog: Catalog) -> Result<Client<S>> {
        let dispatch = logging::dispatch(&self.sinks, self.config.level_filter()?);
        Ok(self.finish(catalog, dispatch))
    }

    /// Fetches the catalog from the catalog server and creates the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the log level is invalid or the catalog cannot
    /// be fetched or parsed.
    pub async fn connect(self) -> Result<Client<S>> {
        let dispatch = logging::dispatch(&self.sinks, self.config.level_filter()?);
        let catalog = fetch_catalog(&self.config)
            .with_subscriber(dispatch.clone())
            .await?;
        Ok(self.finish(catalog, dispatch))
    }

    fn finish(self, catalog: Catalog, dispatch: Dispatch) -> Client<S> {
        let archive = TickArchive::new(
            self.config.cache_dir.clone(),
            self.config.timezone,
            self.source,
        );
        Client {
            key: self.key,
            config: self.config,
            catalog,
            archive,
            sinks: self.sinks,
            dispatch,
        }
    }
}

async fn fetch_catalog(config: &ClientConfig) -> Result<Catalog> {
    info!(server = %config.catalog_server, "requesting symbol catalog");
    let payload = request_catalog(&config.catalog_server, &config.catalog_request).await?;
    let text = std::str::from_utf8(&payload).map_err(|_| ClientError::CatalogEncoding)?;
    let catalog = Catalog::parse(text)?;
    info!(symbols = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Waits for every session, then reports how each one ended.
async fn coordinate(mut sessions: JoinSet<SessionExit>) -> Vec<SessionExit> {
    let mut exits = Vec::with_capacity(sessions.len());
    while let Some(result) = sessions.join_next().await {
        match result {
            Ok(exit) => {
                debug!(?exit, "live session finished");
                exits.push(exit);
            }
            Err(e) => error!(error = %e, "live session panicked"),
        }
    }
    info!("all live sessions finished");
    exits
}

fn join_contracts(contracts: &[Contract]) -> String {
    contracts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Merged live ticks of every session started by [`Client::stream_live`].
///
/// Dropping the stream cancels its sessions.
#[derive(Debug)]
pub struct LiveStream {
    receiver: mpsc::Receiver<Tick>,
    contracts: Vec<Contract>,
    shutdown: CancellationToken,
    coordinator: JoinHandle<Vec<SessionExit>>,
    _cancel_on_drop: DropGuard,
}

impl LiveStream {
    /// Receives the next tick, or `None` once every session has stopped.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.receiver.recv().await
    }

    /// Returns the contracts being streamed, latest first.
    #[must_use]
    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    /// Returns a token that stops every session when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signals every session to stop without waiting.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Stops every session and waits until all of them have exited.
    pub async fn shutdown(self) -> Vec<SessionExit> {
        self.shutdown.cancel();
        match self.coordinator.await {
            Ok(exits) => exits,
            Err(e) => {
                error!(error = %e, "live coordinator failed");
                Vec::new()
            }
        }
    }
}

impl Stream for LiveStream {
    type Item = Tick;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Tick>> {
        self.receiver.poll_recv(cx)
    }
}
