pub mod feedback;
pub mod interaction;
pub mod preference;
pub mod pricing;
pub mod product;
pub mod recommendation;
pub mod similarity;
pub mod trending;
