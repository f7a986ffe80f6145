use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration ({}):", path_display(Self::get_config_path()));
        match &self.backend_url {
            Some(url) => println!("  backend-url: {url}"),
            None => println!("  backend-url: (unset, using {})", self.backend_url()),
        }
        match self.request_timeout_secs {
            Some(secs) if secs > 0 => println!("  request-timeout: {secs}s"),
            _ => println!("  request-timeout: (none)"),
        }
        match &self.audio.command {
            Some(command) => println!("  recorder: {}", command.join(" ")),
            None => println!("  recorder: (default) {}", self.audio.command().join(" ")),
        }
        println!("  relay-bind: {}", self.relay.bind());
        println!("  relay-downstream: {}", self.relay.downstream_url());
    }
}
