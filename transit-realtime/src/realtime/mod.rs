//! Realtime updates: normalized input, delay propagation and outcome
//! statistics.
//!
//! Feed decoders produce [`JourneyUpdate`]s. The [`UpdateApplier`] turns an
//! update and the trip's current schedule into a revised schedule, which the
//! snapshot source installs into its buffer.

mod added;
mod applier;
mod call;
mod error;
mod feed;
mod matcher;

pub use added::{AddedTrip, build_added_trip};
pub use applier::{AppliedUpdate, UpdateApplier};
pub use call::{EstimatedCall, JourneyUpdate, ResolvedTimes};
pub use error::{UpdateError, UpdateErrorKind, UpdateResult};
pub use feed::{CallDto, FeedMessageDto, JourneyUpdateDto, parse_feed_message};
pub use matcher::{RouteDepartureMatcher, TripMatcher};
