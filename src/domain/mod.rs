// Domain layer - Pure data types shared by every other layer
pub mod chart;
pub mod error;
pub mod run;
pub mod sample;
