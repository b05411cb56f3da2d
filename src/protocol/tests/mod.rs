mod packet;
mod packet_proptest;
