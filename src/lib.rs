pub mod api;
pub mod itinerary;
pub mod providers;
pub mod shared;
