//! Configuration module

mod site;

pub use site::CmsConfig;
pub use site::CommentsConfig;
pub use site::RevalidateConfig;
pub use site::SiteConfig;
