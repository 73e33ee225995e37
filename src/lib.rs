// NDC flight-offer response transformer.

pub mod airline;
pub mod client;
pub mod document;
pub mod duration;
pub mod fare_rules;
pub mod offers;
pub mod priced;
pub mod reference_index;
pub mod segment;
pub mod token_cache;

// Re-export key types for convenience
pub use client::{ApiError, ClientConfig, NdcApiClient, RetryConfig};
pub use fare_rules::{BaggageAllowance, BaggageInfo, FareRules, Penalty, PenaltySummary};
pub use offers::{transform, AirlineDetails, FlightOfferRecord, PriceBreakdown};
pub use priced::{transform_priced, PricedFareRecord, PricedSegment, TransformError};
pub use reference_index::{AirportInfo, ReferenceIndex};
pub use segment::{Segment, SegmentEndpoint};
pub use token_cache::{
    AuthError, CredentialSource, OAuthClientCredentialsSource, TokenCache, TokenConfig,
};
