mod scrape;
mod server;

pub use self::{scrape::run_scrape, server::run_server};
