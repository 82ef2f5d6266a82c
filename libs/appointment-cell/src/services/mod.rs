pub mod calendar;
pub mod clock;
pub mod slots;
pub mod policy;
pub mod availability;
pub mod admission;
pub mod blackout;
pub mod lifecycle;
pub mod store;

pub use availability::{AvailabilityService, SlotAvailability};
pub use admission::{AdmissionContext, AdmissionRequest, BookingAdmissionService};
pub use blackout::BlackoutService;
pub use clock::ClinicClock;
pub use lifecycle::{AppointmentLifecycleService, StatusActor};
pub use policy::{BookingPolicy, DateRejection};
pub use store::{InMemorySchedulingStore, SchedulingStore, SupabaseSchedulingStore};
