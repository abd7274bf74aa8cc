pub mod booking;
pub mod catalog;
pub mod profile;
pub mod selection;

pub use booking::{Booking, BookingRequest, BookingStatus, NewBooking};
pub use catalog::{CatalogEntry, CatalogKind, CatalogRecord, Guide, Hotel, HotelRoom, Tour};
pub use profile::{Capabilities, Profile, Role};
pub use selection::{PricedService, ServiceSelection};
