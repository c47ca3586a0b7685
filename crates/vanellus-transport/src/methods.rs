//! Relay method names.

// Anonymous
pub const GET_KEYS: &str = "getKeys";
pub const GET_APPOINTMENTS_BY_ZIP_CODE: &str = "getAppointmentsByZipCode";
pub const GET_APPOINTMENT: &str = "getAppointment";
pub const GET_PROVIDERS_BY_ZIP_CODE: &str = "getProvidersByZipCode";
pub const STORE_SETTINGS: &str = "storeSettings";
pub const GET_SETTINGS: &str = "getSettings";

// User
pub const GET_TOKEN: &str = "getToken";
pub const BOOK_APPOINTMENT: &str = "bookAppointment";
pub const CANCEL_BOOKING: &str = "cancelBooking";

// Provider
pub const STORE_PROVIDER_DATA: &str = "storeProviderData";
pub const CHECK_PROVIDER_DATA: &str = "checkProviderData";
pub const PUBLISH_APPOINTMENTS: &str = "publishAppointments";
pub const GET_PROVIDER_APPOINTMENTS: &str = "getProviderAppointments";

// Mediator
pub const GET_PENDING_PROVIDER_DATA: &str = "getPendingProviderData";
pub const GET_VERIFIED_PROVIDER_DATA: &str = "getVerifiedProviderData";
pub const GET_PROVIDER_DATA: &str = "getProviderData";
pub const CONFIRM_PROVIDER: &str = "confirmProvider";

// Admin
pub const ADD_MEDIATOR_PUBLIC_KEYS: &str = "addMediatorPublicKeys";
pub const RESET_DB: &str = "resetDB";
