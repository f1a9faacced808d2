pub mod club {
    pub mod v1 {
        tonic::include_proto!("club.v1");
    }
}

pub mod market {
    pub mod v1 {
        tonic::include_proto!("market.v1");
    }
}
