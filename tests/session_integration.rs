//! End-to-end session tests against the scripted transport

use ds9_rust::command;
use ds9_rust::io::mock::{MockTransport, RequestKind};
use ds9_rust::io::{AccessPoint, MultipleMatchPolicy, Session, SessionBuilder};
use ds9_rust::protocol::decode::{Decoded, Scalar, ScalarKind, TargetType};
use ds9_rust::protocol::{
    ArrayDescriptor, ArrayOrder, Bitpix, ByteOrder, Endian, PixelArray, Reply,
};
use ds9_rust::Ds9Error;
use ndarray::{arr2, arr3, Array2};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn native_bytes_i16(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn image_mock(bitpix: &str, size: &str, data: Vec<u8>) -> MockTransport {
    let mut mock = MockTransport::new();
    mock.on_get_text("fits bitpix", bitpix)
        .on_get_text("fits size", size)
        .on_get_bytes(format!("array {}", ByteOrder::native()), data);
    mock
}

#[test]
fn test_get_image_end_to_end() {
    init_tracing();
    let mock = image_mock("16\n", "2 2\n", native_bytes_i16(&[1, 2, 3, 4]));
    let mut ds9 = SessionBuilder::new().transport(mock).build();

    let image = ds9.get_image().unwrap().expect("frame holds an image");
    assert_eq!(image.bitpix(), Bitpix::Int16);
    assert_eq!(image.shape(), &[2, 2]);
    match image {
        PixelArray::Int16(pixels) => assert_eq!(pixels, arr2(&[[1i16, 2], [3, 4]]).into_dyn()),
        other => panic!("unexpected pixel type: {:?}", other.bitpix()),
    }

    // bitpix, size, then the raw array: three round trips
    assert_eq!(ds9.transport().requests().len(), 3);
}

#[test]
fn test_get_image_cube() {
    init_tracing();
    let data: Vec<u8> = (0u8..8).collect();
    let mock = image_mock("8", "2 2 2", data);
    let mut ds9 = Session::new(mock);

    let cube = ds9.get_image_as::<u8>().unwrap().unwrap();
    assert_eq!(
        cube,
        arr3(&[[[0u8, 1], [2, 3]], [[4, 5], [6, 7]]]).into_dyn()
    );
}

#[test]
fn test_send_then_read_back() {
    init_tracing();
    let image = Array2::<f32>::from_shape_fn((3, 4), |(y, x)| (y * 10 + x) as f32);

    let mut ds9 = SessionBuilder::new()
        .transport(MockTransport::new())
        .endian(Endian::Little)
        .build();
    ds9.set_array(&image).unwrap();

    let sent = ds9.transport().requests()[0].clone();
    assert_eq!(sent.kind, RequestKind::Set);
    let descriptor: ArrayDescriptor = sent
        .command
        .strip_prefix("array ")
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(descriptor.to_string(), "[xdim=4,ydim=3,bitpix=-32,endian=little]");

    // Feed the uploaded bytes back as the viewer would return them
    let mut mock = MockTransport::new();
    mock.on_get_text("fits bitpix", "-32")
        .on_get_text("fits size", "4 3")
        .on_get_bytes("array little", sent.payload.unwrap());
    let mut ds9 = SessionBuilder::new()
        .transport(mock)
        .endian(Endian::Little)
        .build();
    assert_eq!(ds9.get_image_as::<f32>().unwrap(), Some(image.into_dyn()));
}

#[test]
fn test_get_image_empty_frame() {
    init_tracing();
    let mut ds9 = Session::new(image_mock("0\n", "0 0\n", Vec::new()));

    assert_eq!(ds9.get_image_as::<u8>().unwrap(), None);
    // the pixel request is skipped
    assert_eq!(ds9.transport().commands(), vec!["fits bitpix", "fits size"]);
}

#[test]
fn test_widened_upload() {
    let mut ds9 = Session::new(MockTransport::new());
    ds9.set_array(&arr2(&[[1u16, 2], [3, 4]])).unwrap();
    let sent = &ds9.transport().requests()[0];
    assert!(sent.command.contains("bitpix=-32"));
    assert_eq!(sent.payload.as_ref().map(Vec::len), Some(16));
}

#[test]
fn test_column_major_session() {
    let mut ds9 = SessionBuilder::new()
        .transport(MockTransport::new())
        .array_order(ArrayOrder::ColumnMajor)
        .endian(Endian::Big)
        .build();

    // shape [x, y] = [2, 3]
    let image = arr2(&[[1u8, 2, 3], [4, 5, 6]]);
    ds9.set_array(&image).unwrap();

    let sent = &ds9.transport().requests()[0];
    assert_eq!(sent.command, "array [xdim=2,ydim=3,bitpix=8,endian=big]");
    assert_eq!(sent.payload.as_deref(), Some(&[1u8, 4, 2, 5, 3, 6][..]));
}

#[test]
fn test_version_and_typed_gets() {
    let mut mock = MockTransport::new();
    mock.on_get_text("version", "ds9 8.7b1\n")
        .on_get_text("crosshair lock", "yes\n")
        .on_get_text("fits size", "1024 1024\n")
        .on_get_text("frame all", "1 2 3\n");
    let mut ds9 = Session::new(mock);

    let version = ds9.version().unwrap();
    assert_eq!((version.major, version.minor), (8, 7));
    assert_eq!(version.prerelease.as_deref(), Some("b1"));

    assert!(ds9.get::<bool>("crosshair lock").unwrap());
    assert_eq!(ds9.get::<[u32; 2]>("fits size").unwrap(), [1024, 1024]);
    assert!(matches!(
        ds9.get::<[u32; 3]>("fits size"),
        Err(Ds9Error::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
    assert_eq!(ds9.get::<Vec<u32>>("frame all").unwrap(), vec![1, 2, 3]);

    let decoded = ds9
        .get_as("fits size", &TargetType::Tuple(ScalarKind::Int, 2))
        .unwrap();
    assert_eq!(
        decoded,
        Decoded::Tuple(vec![Scalar::Int(1024), Scalar::Int(1024)])
    );
}

#[test]
fn test_multiple_access_points() {
    init_tracing();
    let aps = vec![
        AccessPoint::new("DS9", "first", "7f000001:1"),
        AccessPoint::new("DS9", "second", "7f000001:2"),
    ];

    let mut lenient = Session::new(MockTransport::with_access_points(aps.clone()));
    lenient.set("frame 1").unwrap();
    assert_eq!(lenient.current().unwrap().name, "first");
    assert_eq!(lenient.transport().requests()[0].target, "7f000001:1");

    let mut strict = SessionBuilder::new()
        .transport(MockTransport::with_access_points(aps))
        .multiple_matches(MultipleMatchPolicy::Error)
        .build();
    assert!(matches!(
        strict.set("frame 1"),
        Err(Ds9Error::MultipleMatches { count: 2, .. })
    ));

    let mut named = SessionBuilder::new()
        .transport(strict.into_transport())
        .target("DS9:second")
        .build();
    named.set("frame 1").unwrap();
    assert_eq!(named.current().unwrap().address, "7f000001:2");
}

#[test]
fn test_server_error_and_throw_switch() {
    let mut mock = MockTransport::new();
    mock.on_set("zoom to banana", Reply::error("DS9:ds9", "invalid zoom value"));

    let mut strict = Session::new(mock.clone());
    match strict.set(&command!("zoom", "to", "banana")) {
        Err(Ds9Error::Server { server, message }) => {
            assert_eq!(server, "DS9:ds9");
            assert_eq!(message, "invalid zoom value");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let mut lenient = SessionBuilder::new()
        .transport(mock)
        .throw_on_error(false)
        .build();
    let respondents = lenient.set("zoom to banana").unwrap();
    assert_eq!(
        respondents,
        vec![("DS9:ds9".to_string(), Some("invalid zoom value".to_string()))]
    );
}

#[test]
fn test_no_reply_to_get() {
    let mut ds9 = Session::new(MockTransport::new());
    match ds9.get::<String>("cmap") {
        Err(Ds9Error::NoReply { command, .. }) => assert_eq!(command, "cmap"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_no_viewer_running() {
    let mut mock = MockTransport::new();
    mock.set_alive(false);
    let mut ds9 = Session::new(mock);
    assert!(matches!(ds9.version(), Err(Ds9Error::Connection(_))));
    assert!(matches!(ds9.set("frame 1"), Err(Ds9Error::Connection(_))));
}

#[test]
fn test_empty_commands() {
    let mut ds9 = Session::new(MockTransport::new());
    assert!(ds9.set("").unwrap().is_empty());
    assert!(ds9.set(&command!("")).unwrap().is_empty());
    assert!(matches!(ds9.get::<String>(""), Err(Ds9Error::NoReply { .. })));
    assert!(ds9.transport().requests().is_empty());
}

#[test]
fn test_invalid_byte_order_keyword() {
    assert!("middle".parse::<ByteOrder>().is_err());
    assert!("native".parse::<Endian>().is_ok());
}
