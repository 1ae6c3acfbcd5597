mod selector;

pub use selector::{
    find_host, is_alive_replica, is_master, HostSelector, Lookup, RoundRobinSelector, SyncPolicy,
};

/// Host selection route exposed to the routing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Alive primary, no fallback
    Master,
    /// Round-robin alive replica, primary if none
    Replica,
    /// First replica within the time bound, else primary
    SyncByTime,
    /// First replica within the byte bound, else primary
    SyncByBytes,
    /// First replica within either bound, else primary
    SyncByTimeOrBytes,
    /// First replica within both bounds, else primary
    SyncByTimeAndBytes,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Master,
        Route::Replica,
        Route::SyncByTime,
        Route::SyncByBytes,
        Route::SyncByTimeOrBytes,
        Route::SyncByTimeAndBytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Master => "master",
            Route::Replica => "replica",
            Route::SyncByTime => "sync_by_time",
            Route::SyncByBytes => "sync_by_bytes",
            Route::SyncByTimeOrBytes => "sync_by_time_or_bytes",
            Route::SyncByTimeAndBytes => "sync_by_time_and_bytes",
        }
    }

    /// Route for a request path such as `/sync_by_time`
    pub fn from_path(path: &str) -> Option<Route> {
        let name = path.trim_start_matches('/');
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}
