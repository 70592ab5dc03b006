//! Change notification stream trait.

use std::pin::Pin;

use futures_core::Stream;

use crate::Result;

/// A notification that something in the bookmark collection changed.
///
/// Deliberately payload-free: the stream does not say which record
/// changed or how, so the only correct reaction is a full reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeNotice;

/// Stream of change notices for the record store's collection.
pub trait ChangeFeed: Stream<Item = Result<ChangeNotice>> + Send {}

impl<T> ChangeFeed for T where T: Stream<Item = Result<ChangeNotice>> + Send {}

/// A boxed change feed, as handed across the [`RecordStore`] seam.
///
/// [`RecordStore`]: crate::traits::RecordStore
pub type BoxedChangeFeed = Pin<Box<dyn ChangeFeed>>;
