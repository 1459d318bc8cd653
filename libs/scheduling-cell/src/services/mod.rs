pub mod availability;
pub mod booking;
pub mod constraints;
pub mod rules;
pub mod slots;

pub use availability::AvailabilityChecker;
pub use booking::SmartSchedulingService;
pub use constraints::ConstraintStore;
pub use rules::RuleEngine;
pub use slots::SlotGenerator;
