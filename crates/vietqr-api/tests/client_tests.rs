// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};
use vietqr_api::{
    Client, FixedPosition, Geocoder, LocationError, Position, PositionError, QR_REQUEST_FAILED,
    resolve_location_name,
};
use vietqr_app::QrRequest;

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());
    Ok((server, addr))
}

fn respond_json(request: Request, status: u16, body: &str) {
    let response = Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        );
    request.respond(response).expect("response should succeed");
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn sample_request() -> QrRequest {
    QrRequest {
        acq_id: 970_436,
        account_no: "0011223344".to_owned(),
        account_name: "NGUYEN VAN A".to_owned(),
        amount: None,
        add_info: "Chuc quy khach buoi trua tot lanh".to_owned(),
        template: "compact".to_owned(),
        format: "image".to_owned(),
    }
}

#[test]
fn unreachable_service_error_names_the_endpoint() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/v2", Duration::from_millis(200))?;
    let error = client
        .list_banks()
        .expect_err("listing banks should fail for an unreachable endpoint");
    assert!(error.to_string().contains("127.0.0.1:1"));
    Ok(())
}

#[test]
fn list_banks_parses_directory_and_drops_bad_bins() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/v2/banks");
        respond_json(
            request,
            200,
            r#"{"code":"00","desc":"Get Bank list successful!","data":[
                {"id":43,"name":"Ngân hàng TMCP Ngoại Thương Việt Nam","code":"VCB","bin":"970436","shortName":"Vietcombank","logo":"https://api.vietqr.io/img/VCB.png","transferSupported":1,"lookupSupported":1},
                {"id":99,"name":"Broken","code":"XXX","bin":"","shortName":"Broken","logo":"","transferSupported":0,"lookupSupported":0},
                {"id":17,"name":"Ngân hàng TMCP Công thương Việt Nam","code":"ICB","bin":"970415","shortName":"VietinBank","logo":"","transferSupported":1,"lookupSupported":0}
            ]}"#,
        );
    });

    let client = Client::new(&format!("{addr}/v2/"), Duration::from_secs(1))?;
    let banks = client.list_banks()?;
    let bins: Vec<u32> = banks.iter().map(|bank| bank.bin).collect();
    assert_eq!(bins, vec![970_436, 970_415]);
    assert_eq!(banks[0].short_name, "Vietcombank");
    assert!(!banks[1].lookup_supported);

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn list_banks_reports_service_description_on_bad_code() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        respond_json(request, 200, r#"{"code":"99","desc":"Service maintenance","data":[]}"#);
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client.list_banks().expect_err("bad code should fail");
    assert_eq!(error.to_string(), "Service maintenance");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn generate_qr_sends_payload_and_credentials() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/generate");
        assert_eq!(
            header_value(&request, "x-client-id").as_deref(),
            Some("client-1")
        );
        assert_eq!(header_value(&request, "x-api-key").as_deref(), Some("key-1"));

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body should be readable");
        let payload: serde_json::Value = serde_json::from_str(&body).expect("JSON payload");
        assert_eq!(payload["acqId"], 970_436);
        assert_eq!(payload["accountNo"], "0011223344");
        assert_eq!(payload["template"], "compact");
        assert!(payload.get("amount").is_none());

        respond_json(
            request,
            200,
            r#"{"code":"00","desc":"Gen VietQR successful!","data":{"qrCode":"000201","qrDataURL":"data:image/png;base64,AAAA"}}"#,
        );
    });

    let client = Client::new(&addr, Duration::from_secs(1))?
        .with_credentials(Some("client-1"), Some("key-1"));
    let outcome = client.generate_qr(&sample_request())?;
    assert!(outcome.succeeded);
    assert_eq!(
        outcome.image.map(|image| image.data_url),
        Some("data:image/png;base64,AAAA".to_owned())
    );

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn generate_qr_turns_rejection_into_failed_outcome() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(header_value(&request, "x-api-key"), None);
        respond_json(
            request,
            200,
            r#"{"code":"51","desc":"Invalid account number","data":null}"#,
        );
    });

    let client = Client::new(&addr, Duration::from_secs(1))?.with_credentials(Some(" "), None);
    let outcome = client.generate_qr(&sample_request())?;
    assert!(!outcome.succeeded);
    assert_eq!(outcome.description, "Invalid account number");
    assert!(outcome.image.is_none());

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn generate_qr_http_failure_has_user_message() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        respond_json(request, 500, r#"{"desc":"internal"}"#);
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .generate_qr(&sample_request())
        .expect_err("HTTP 500 should fail");
    assert_eq!(error.to_string(), QR_REQUEST_FAILED);

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn reverse_geocoding_builds_short_name() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert!(request.url().starts_with("/reverse?format=jsonv2&lat=21.0285&lon=105.8542"));
        assert_eq!(
            header_value(&request, "Accept-Language").as_deref(),
            Some("vi")
        );
        assert!(header_value(&request, "User-Agent").is_some_and(|agent| agent.starts_with("vietqr/")));
        respond_json(
            request,
            200,
            r#"{"display_name":"Hoàn Kiếm, Hà Nội, Việt Nam","address":{"road":"Phố Tràng Tiền","suburb":"Phường Tràng Tiền","city":"Thành phố Hà Nội","state":"Hà Nội"}}"#,
        );
    });

    let geocoder = Geocoder::new(&addr, "vi", Duration::from_secs(1))?;
    let mut source = FixedPosition(Some(Position {
        latitude: 21.0285,
        longitude: 105.8542,
    }));
    let name = resolve_location_name(&mut source, &geocoder)?;
    assert_eq!(name, "Phố Tràng Tiền, Phường Tràng Tiền, Hà Nội");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn reverse_geocoding_failure_is_prefixed() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        respond_json(request, 503, "{}");
    });

    let geocoder = Geocoder::new(&addr, "vi", Duration::from_secs(1))?;
    let mut source = FixedPosition(Some(Position {
        latitude: 16.0544,
        longitude: 108.2022,
    }));
    let error = resolve_location_name(&mut source, &geocoder)
        .expect_err("unavailable geocoder should fail");
    assert_eq!(
        error.to_string(),
        "Could not retrieve location. Reverse geocoding request failed."
    );

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn missing_position_never_reaches_the_geocoder() -> Result<()> {
    let geocoder = Geocoder::new("http://127.0.0.1:1", "vi", Duration::from_millis(50))?;
    let mut source = FixedPosition(None);
    let error = resolve_location_name(&mut source, &geocoder)
        .expect_err("missing position should fail");
    assert_eq!(error, LocationError::Position(PositionError::Unavailable));
    assert_eq!(
        error.to_string(),
        "Could not retrieve location. Position unavailable."
    );
    Ok(())
}
