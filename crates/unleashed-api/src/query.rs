// Status document selectors for `POST /admin/_cmdstat.jsp`.

/// Path every status document is posted to.
pub const CMDSTAT_PATH: &str = "/admin/_cmdstat.jsp";

/// One of the three status documents fetched per scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatQuery {
    /// AP inventory (`apmgr`): display names and models.
    Inventory,
    /// AP status (`stamgr`): counters, role, radios.
    ApStatus,
    /// Associated stations (`stamgr`): one record per client.
    Clients,
}

impl StatQuery {
    pub const ALL: [Self; 3] = [Self::Inventory, Self::ApStatus, Self::Clients];

    /// The fixed XML request body selecting this document.
    pub fn body(self) -> &'static str {
        match self {
            Self::Inventory => "<ajax-request action='getstat' comp='apmgr'><ap-list /></ajax-request>",
            Self::ApStatus => "<ajax-request action='getstat' comp='stamgr'><ap /></ajax-request>",
            Self::Clients => "<ajax-request action='getstat' comp='stamgr'><client /></ajax-request>",
        }
    }

    /// Name of the repeated element carrying one record in the reply.
    pub fn record_element(self) -> &'static str {
        match self {
            Self::Inventory | Self::ApStatus => "ap",
            Self::Clients => "client",
        }
    }

    /// Short label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::ApStatus => "ap-status",
            Self::Clients => "clients",
        }
    }
}
