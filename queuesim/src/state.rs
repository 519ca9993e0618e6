use std::fmt;

/// Status of the single server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    /// Nothing to transmit.
    Idle,
    /// Transmitting a packet.
    Busy,
}

impl Default for ServerStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Maximum number of packets the system can hold, including the one in service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capacity {
    /// Infinite buffer (M/M/1).
    Unbounded,
    /// Finite buffer of the given size (M/M/1/K).
    Bounded(usize),
}

impl Default for Capacity {
    fn default() -> Self {
        Self::Unbounded
    }
}

impl From<Option<usize>> for Capacity {
    fn from(capacity: Option<usize>) -> Self {
        capacity.map_or(Self::Unbounded, Self::Bounded)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "inf"),
            Self::Bounded(k) => write!(f, "{}", k),
        }
    }
}

impl Capacity {
    /// Admission predicate: checks if an arriving packet fits into a system holding `occupancy`
    /// packets.
    #[must_use]
    pub fn accepts(self, occupancy: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(k) => occupancy < k,
        }
    }

    /// Returns the bound, or `None` if unbounded.
    #[must_use]
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(k) => Some(k),
        }
    }
}

/// Mutable state of the queue.
///
/// Packets are not modeled individually: the number of packets in the system together with the
/// server status is all that is needed to decide on admission and service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    status: ServerStatus,
    occupancy: usize,
    capacity: Capacity,
}

impl QueueState {
    /// Constructs an empty queue with an idle server.
    #[must_use]
    pub fn new(capacity: Capacity) -> Self {
        Self {
            status: ServerStatus::Idle,
            occupancy: 0,
            capacity,
        }
    }

    /// Registers an arriving packet.
    ///
    /// Returns `None` if the packet was dropped because the buffer is full. Otherwise, returns
    /// `Some(true)` if the server was idle and has just started transmitting the packet, or
    /// `Some(false)` if the packet joined the buffer behind a busy server.
    pub fn admit(&mut self) -> Option<bool> {
        if !self.capacity.accepts(self.occupancy) {
            return None;
        }
        self.occupancy += 1;
        if self.status == ServerStatus::Idle {
            self.status = ServerStatus::Busy;
            Some(true)
        } else {
            Some(false)
        }
    }

    /// Registers a finished transmission. Returns `true` if there is another packet to serve,
    /// in which case the server stays busy.
    ///
    /// # Panics
    ///
    /// Panics if there is no packet in the system.
    pub fn complete(&mut self) -> bool {
        assert!(self.occupancy > 0, "departure from an empty system");
        self.occupancy -= 1;
        if self.occupancy > 0 {
            true
        } else {
            self.status = ServerStatus::Idle;
            false
        }
    }

    /// Current server status.
    #[must_use]
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Checks if the server is idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.status == ServerStatus::Idle
    }

    /// Number of packets in the system, queued or in service.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// Buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}
