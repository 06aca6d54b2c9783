pub mod checksum_service;
