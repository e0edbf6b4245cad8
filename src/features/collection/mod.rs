mod collector;

pub use collector::HealthCollector;
