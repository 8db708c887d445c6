//! Client-side core for the storefront admin screens: paginated collection
//! controllers for users, products and categories, plus the local cart mirror.

pub mod api;
pub mod cart;
pub mod catalog;
pub mod controller;
pub mod error;
pub mod normalize;
pub mod notify;
pub mod paging;

pub use api::{ApiClient, CollectionApi, HttpCollectionApi, DEFAULT_REQUEST_TIMEOUT};
pub use cart::{
    CartApi, CartCache, CartEvent, CartService, HttpCartApi, MemoryCartCache, StoredCartCache,
};
pub use controller::{DialogCloser, FetchStatus, MutationOutcome, ResourceController};
pub use error::{ApiFailure, ClientSetupError, ControllerError, PageError};
pub use normalize::{normalize, normalize_value, NormalizedResponse};
pub use notify::{BroadcastSink, Notification, NotificationSink, Severity, TracingSink};
pub use paging::{CollectionPage, PagePhase, PageSnapshot};
