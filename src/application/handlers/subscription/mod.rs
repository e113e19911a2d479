pub mod reconciler;

pub use reconciler::SubscriptionReconciler;
