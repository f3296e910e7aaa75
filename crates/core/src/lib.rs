pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod recommend;
pub mod store;

pub use domain::feedback::{FeedbackAction, FeedbackTally, RecommendationFeedback};
pub use domain::interaction::{InteractionCounts, PeriodActivity, UserId, UserInteractionSummary};
pub use domain::preference::{PriceBand, UserPreferenceProfile};
pub use domain::pricing::{PriceAdjustment, PricingRule, PricingRuleId, RuleScope, SpecialDayId};
pub use domain::product::{FlowerTypeDirectory, FlowerTypeId, Product, ProductId, ProductStatus};
pub use domain::recommendation::{CandidateCategory, RecommendationType};
pub use domain::similarity::{ProductSimilarity, SimilarityKind};
pub use domain::trending::{TrendPeriod, TrendingProduct};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::{PriceResolution, PricingService};
pub use recommend::{
    RecommendationCandidate, RecommendationEngine, RecommendationRequest, RecommendationResponse,
    RecommendationSettings,
};
pub use store::{EngineStores, StoreError};
