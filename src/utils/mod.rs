pub mod ethernet;
pub mod pcap_reader;
pub mod pcap_writer;
