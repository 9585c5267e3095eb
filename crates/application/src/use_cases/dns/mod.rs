pub mod handle_dns_response;

pub use handle_dns_response::{DnsResponseOutcome, HandleDnsResponseUseCase};
