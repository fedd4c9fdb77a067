//! Merges live events into a [`SharedCollection`].
//!
//! Two event shapes are handled. An append carries a whole entity and is
//! inserted at the end of the collection unless its id is already there. An
//! invalidation carries nothing the view can trust, so the reconciler only
//! forwards an [`Invalidate`] command to the view's [`RefetchWorker`], which
//! re-runs the authoritative fetch once per command and swaps the collection
//! wholesale.
//!
//! Neither path touches pagination. Clamping the current page after a
//! refetch-driven shrink is left to the view (see
//! [`PageView::clamp_page`](crate::pagination::PageView::clamp_page)).

use crate::collection::{Identified, SharedCollection};
use crate::error::Error;
use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The collaborator that owns the authoritative copy of a collection.
#[async_trait]
pub trait Refetch<T>: Send + Sync {
    async fn refetch(&self) -> Result<Vec<T>, Error>;
}

/// One-directional command from the live channel to the owning view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidate {
    /// Name of the live event that caused it.
    pub event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Appended,
    AlreadyPresent,
    RefetchRequested,
    /// The owning view is gone; nothing will refetch.
    Dropped,
}

pub struct ViewReconciler<T> {
    collection: SharedCollection<T>,
    invalidations: mpsc::UnboundedSender<Invalidate>,
}

impl<T> Clone for ViewReconciler<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            invalidations: self.invalidations.clone(),
        }
    }
}

impl<T: Identified> ViewReconciler<T> {
    /// Returns the reconciler together with the receiving end of its
    /// invalidate commands, which belongs to the view's refetch worker.
    pub fn new(collection: SharedCollection<T>) -> (Self, mpsc::UnboundedReceiver<Invalidate>) {
        let (invalidations, receiver) = mpsc::unbounded_channel();
        (
            Self {
                collection,
                invalidations,
            },
            receiver,
        )
    }

    pub fn collection(&self) -> &SharedCollection<T> {
        &self.collection
    }

    pub fn on_append(&self, item: T) -> Reconciliation {
        let id = item.id().to_string();
        if self.collection.append_if_absent(item) {
            debug!("Appended {id}");
            Reconciliation::Appended
        } else {
            trace!("Ignoring duplicate delivery of {id}");
            Reconciliation::AlreadyPresent
        }
    }

    pub fn on_invalidate(&self, event: &str) -> Reconciliation {
        let command = Invalidate {
            event: event.to_string(),
        };
        match self.invalidations.send(command) {
            Ok(()) => Reconciliation::RefetchRequested,
            Err(_) => {
                warn!("No view is listening for invalidations of {event}");
                Reconciliation::Dropped
            }
        }
    }
}

/// Runs the authoritative fetch for one view, once per [`Invalidate`].
///
/// On failure the stale collection stays in place and the next command (or an
/// explicit [`RefetchWorker::refresh`]) tries again.
pub struct RefetchWorker<T, R> {
    collection: SharedCollection<T>,
    source: Arc<R>,
    commands: mpsc::UnboundedReceiver<Invalidate>,
}

impl<T, R> RefetchWorker<T, R>
where
    T: Identified + Send + Sync + 'static,
    R: Refetch<T> + 'static,
{
    pub fn new(
        collection: SharedCollection<T>,
        source: Arc<R>,
        commands: mpsc::UnboundedReceiver<Invalidate>,
    ) -> Self {
        Self {
            collection,
            source,
            commands,
        }
    }

    /// Fetches once and replaces the collection on success.
    pub async fn refresh(&self) -> Result<usize, Error> {
        let items = self.source.refetch().await.map_err(Error::refetch)?;
        let count = items.len();
        self.collection.replace_all(items);
        Ok(count)
    }

    /// Processes commands until every reconciler handle has been dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match self.refresh().await {
                Ok(count) => debug!("Refetched {count} entities after {}", command.event),
                Err(e) => warn!(
                    "Refetch after {} failed, keeping the stale collection: {e}",
                    command.event
                ),
            }
        }
        debug!("Refetch worker stopped");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
