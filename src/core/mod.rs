// Record-level pipeline stages and shared errors/models
pub mod validation {
    pub use crate::validation::*;
}

pub mod cleaning {
    pub use crate::cleaning::*;
}

pub mod dedup {
    pub use crate::dedup::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
