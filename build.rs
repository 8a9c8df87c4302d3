fn main() {
    // Only run gRPC codegen when the "grpc" feature is enabled.
    // Cargo sets CARGO_FEATURE_GRPC when compiling with --features grpc.
    if std::env::var("CARGO_FEATURE_GRPC").is_ok() {
        let store_proxy = tonic_build::manual::Service::builder()
            .name("StoreProxy")
            .package("eventbus.proxy")
            .method(
                tonic_build::manual::Method::builder()
                    .name("publish")
                    .route_name("Publish")
                    .input_type("crate::transport::grpc::PublishRequest")
                    .output_type("crate::transport::grpc::Empty")
                    .codec_path("tonic::codec::ProstCodec")
                    .build(),
            )
            .method(
                tonic_build::manual::Method::builder()
                    .name("subscribe")
                    .route_name("Subscribe")
                    .input_type("crate::transport::grpc::SubscribeRequest")
                    .output_type("crate::transport::grpc::SubscribeResponse")
                    .codec_path("tonic::codec::ProstCodec")
                    .server_streaming()
                    .build(),
            )
            .method(
                tonic_build::manual::Method::builder()
                    .name("ack")
                    .route_name("Ack")
                    .input_type("crate::transport::grpc::AckRequest")
                    .output_type("crate::transport::grpc::Empty")
                    .codec_path("tonic::codec::ProstCodec")
                    .client_streaming()
                    .build(),
            )
            .build();

        let cloud_events = tonic_build::manual::Service::builder()
            .name("CloudEvents")
            .package("eventbus.cloudevents")
            .method(
                tonic_build::manual::Method::builder()
                    .name("send")
                    .route_name("Send")
                    .input_type("crate::transport::grpc::BatchEvent")
                    .output_type("crate::transport::grpc::Empty")
                    .codec_path("tonic::codec::ProstCodec")
                    .build(),
            )
            .build();

        tonic_build::manual::Builder::new().compile(&[store_proxy, cloud_events]);
    }
}
