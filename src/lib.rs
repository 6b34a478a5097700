pub mod clock;
pub mod config;
pub mod error;
pub mod router;
pub mod scheduler;
pub mod state;

pub mod client;

pub mod models {
    pub mod attendance;
    pub mod location;
    pub mod payload;
    pub mod session;
}

pub mod services {
    pub mod activity;
    pub mod attendance;
    pub mod daily_guard;
    pub mod geofence;
    pub mod schedule;
    pub mod session;
}

pub mod handlers {
    pub mod location;
    pub mod manual;
    pub mod response;
    pub mod status;
}

pub mod validation {
    pub mod location;
}
