use athancontrol::{ControlCommand, ControlError, ControlTransport, UpnpControlTransport};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AVT: &str = "/MediaRenderer/AVTransport/Control";
const RC: &str = "/MediaRenderer/RenderingControl/Control";

fn ok_body(action: &str, service: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action}Response xmlns:u="urn:schemas-upnp-org:service:{service}:1"></u:{action}Response></s:Body></s:Envelope>"#
    )
}

const FAULT_701: &str = r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>701</errorCode><errorDescription>Transition not available</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#;

async fn transport_for(server: &MockServer, timeout: Duration) -> (UpnpControlTransport, String) {
    let addr = server.address();
    (
        UpnpControlTransport::new(addr.port(), timeout),
        addr.ip().to_string(),
    )
}

#[tokio::test]
async fn test_full_sequence_hits_both_services() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(AVT))
        .and(header(
            "SOAPACTION",
            "\"urn:schemas-upnp-org:service:AVTransport:1#BecomeCoordinatorOfStandaloneGroup\"",
        ))
        .and(body_string_contains("<InstanceID>0</InstanceID>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ok_body("BecomeCoordinatorOfStandaloneGroup", "AVTransport")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(RC))
        .and(header(
            "SOAPACTION",
            "\"urn:schemas-upnp-org:service:RenderingControl:1#SetVolume\"",
        ))
        .and(body_string_contains("<Channel>Master</Channel>"))
        .and(body_string_contains("<DesiredVolume>5</DesiredVolume>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("SetVolume", "RenderingControl")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(AVT))
        .and(header(
            "SOAPACTION",
            "\"urn:schemas-upnp-org:service:AVTransport:1#SetAVTransportURI\"",
        ))
        .and(body_string_contains(
            "<CurrentURI>http://10.0.0.2:8080/fajr/Adhan%20Makkah.mp3</CurrentURI>",
        ))
        .and(body_string_contains("<CurrentURIMetaData"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("SetAVTransportURI", "AVTransport")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(AVT))
        .and(header(
            "SOAPACTION",
            "\"urn:schemas-upnp-org:service:AVTransport:1#Play\"",
        ))
        .and(body_string_contains("<Speed>1</Speed>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("Play", "AVTransport")))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, host) = transport_for(&server, Duration::from_secs(5)).await;
    let sequence =
        ControlCommand::broadcast_sequence(5, "http://10.0.0.2:8080/fajr/Adhan%20Makkah.mp3");
    for command in &sequence {
        transport.execute(&host, command).await.unwrap();
    }
}

#[tokio::test]
async fn test_content_type_is_xml() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AVT))
        .and(header("content-type", "text/xml; charset=\"utf-8\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("Play", "AVTransport")))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, host) = transport_for(&server, Duration::from_secs(5)).await;
    transport.execute(&host, &ControlCommand::Play).await.unwrap();
}

#[tokio::test]
async fn test_upnp_fault_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AVT))
        .respond_with(ResponseTemplate::new(500).set_body_string(FAULT_701))
        .mount(&server)
        .await;

    let (transport, host) = transport_for(&server, Duration::from_secs(5)).await;
    let err = transport
        .execute(&host, &ControlCommand::Play)
        .await
        .unwrap_err();

    match err {
        ControlError::Upnp { fault, status, action } => {
            assert_eq!(action, "Play");
            assert_eq!(fault.error_code, 701);
            assert_eq!(status, 500);
        }
        other => panic!("expected a UPnP fault, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_2xx_without_fault_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let (transport, host) = transport_for(&server, Duration::from_secs(5)).await;
    let err = transport
        .execute(&host, &ControlCommand::SetVolume(15))
        .await
        .unwrap_err();
    assert!(matches!(err, ControlError::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_slow_device_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ok_body("Play", "AVTransport"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (transport, host) = transport_for(&server, Duration::from_millis(200)).await;
    let err = transport
        .execute(&host, &ControlCommand::Play)
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_unreachable_device_is_a_transport_error() {
    // Nothing listens on the discard port of localhost
    let transport = UpnpControlTransport::new(9, Duration::from_secs(2));
    let err = transport
        .execute("127.0.0.1", &ControlCommand::Play)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ControlError::Transport { .. } | ControlError::Timeout { .. }
    ));
}
