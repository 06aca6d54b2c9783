pub mod rollback_ports;
