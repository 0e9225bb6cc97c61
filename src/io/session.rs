//! Viewer session
//!
//! A [`Session`] owns a transport and remembers which access point it talks
//! to. The access point is resolved lazily: before every request the current
//! one is checked with [`Transport::is_alive`], and if it is gone the stored
//! template is looked up again. Nothing is cached beyond that; every call
//! queries the viewer.

use ndarray::{ArrayBase, ArrayD, Data, Dimension};

use crate::command;
use crate::error::{Ds9Error, Result};
use crate::io::access_point::{AccessPoint, Target};
use crate::io::dispatcher::{self, GetOptions, MultipleMatchPolicy, SetOptions};
use crate::io::transport::Transport;
use crate::io::xpa_tools::XpaToolsTransport;
use crate::protocol::decode::{decode, decode_array, Decoded, FromReply, TargetType};
use crate::protocol::pixel::{
    encode_array, ArrayDescriptor, ArrayOrder, Bitpix, Endian, IntoPixel, PixelArray,
    PixelElement,
};
use crate::protocol::reply::Reply;
use tracing::{debug, info, warn};

/// Default access point template
pub const DEFAULT_TARGET: &str = "DS9:*";

/// Settings shared by every request of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Template or address looked up when (re)connecting
    pub target: String,
    pub policy: MultipleMatchPolicy,
    pub throw_on_error: bool,
    pub fail_on_no_reply: bool,
    /// Layout of arrays handed to and returned by the session
    pub order: ArrayOrder,
    /// Byte order requested for binary transfers
    pub endian: Endian,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            target: DEFAULT_TARGET.to_string(),
            policy: MultipleMatchPolicy::Warn,
            throw_on_error: true,
            fail_on_no_reply: false,
            order: ArrayOrder::RowMajor,
            endian: Endian::Native,
        }
    }
}

/// Connection to one viewer instance
///
/// **Recommended**: Use [`SessionBuilder`](crate::io::builder::SessionBuilder):
/// ```no_run
/// use ds9_rust::io::SessionBuilder;
///
/// let mut session = SessionBuilder::new().xpa_tools().target("DS9:ds9").build();
/// session.set("zoom to fit")?;
/// # Ok::<(), ds9_rust::Ds9Error>(())
/// ```
#[derive(Debug)]
pub struct Session<T: Transport = XpaToolsTransport> {
    transport: T,
    current: Option<AccessPoint>,
    config: SessionConfig,
}

impl<T: Transport> Session<T> {
    /// Session with default settings; nothing is contacted yet
    pub fn new(transport: T) -> Self {
        Session::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Session {
            transport,
            current: None,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Currently selected access point, if connected
    pub fn current(&self) -> Option<&AccessPoint> {
        self.current.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Select the access point matching `template`
    ///
    /// `template` is a `class:name` template (wildcards allowed) or a fully
    /// qualified address. The template is kept for later reconnection.
    ///
    /// # Errors
    ///
    /// * `InvalidAccessPoint` - malformed identifier
    /// * `Connection` - no access point matches
    /// * `MultipleMatches` - several match under [`MultipleMatchPolicy::Error`]
    ///
    /// # Examples
    ///
    /// ```
    /// use ds9_rust::io::mock::MockTransport;
    /// use ds9_rust::io::Session;
    ///
    /// let mut session = Session::new(MockTransport::new());
    /// let ap = session.connect("DS9:ds9")?;
    /// assert_eq!(ap.id(), "DS9:ds9");
    /// # Ok::<(), ds9_rust::Ds9Error>(())
    /// ```
    pub fn connect(&mut self, template: &str) -> Result<AccessPoint> {
        let target: Target = template.parse()?;
        self.current = None;
        self.config.target = template.to_string();

        let ap = match target {
            Target::Address(addr) => {
                let ap = AccessPoint::from_address(addr);
                if !self.transport.is_alive(&ap) {
                    return Err(no_access_point(template));
                }
                ap
            }
            Target::Template { .. } => {
                let mut found = self.transport.lookup(template)?;
                match found.len() {
                    0 => return Err(no_access_point(template)),
                    1 => {}
                    n => match self.config.policy {
                        MultipleMatchPolicy::Error => {
                            return Err(Ds9Error::MultipleMatches {
                                target: template.to_string(),
                                count: n,
                            });
                        }
                        MultipleMatchPolicy::Warn => {
                            warn!("{} access points match {}, using {}", n, template, found[0]);
                        }
                        MultipleMatchPolicy::First => {}
                    },
                }
                found.swap_remove(0)
            }
        };

        info!("Connected to {}", ap);
        self.current = Some(ap.clone());
        Ok(ap)
    }

    /// Forget the current access point
    pub fn disconnect(&mut self) {
        if let Some(ap) = self.current.take() {
            debug!("Disconnected from {}", ap);
        }
    }

    /// Address of a live access point, reconnecting if needed
    fn address(&mut self) -> Result<String> {
        if let Some(ap) = &self.current {
            if self.transport.is_alive(ap) {
                return Ok(ap.address.clone());
            }
            debug!("{} stopped answering, looking up {} again", ap, self.config.target);
        }
        let template = self.config.target.clone();
        Ok(self.connect(&template)?.address)
    }

    fn get_options(&self) -> GetOptions {
        GetOptions {
            nmax: 1,
            policy: self.config.policy,
        }
    }

    fn set_options(&self) -> SetOptions {
        SetOptions {
            nmax: 1,
            throw_on_error: self.config.throw_on_error,
            fail_on_no_reply: self.config.fail_on_no_reply,
        }
    }

    /// Send a get request and return the raw reply
    pub fn get_reply(&mut self, command: &str) -> Result<Reply> {
        if command.trim().is_empty() {
            return Err(Ds9Error::NoReply {
                target: self.config.target.clone(),
                command: command.to_string(),
            });
        }
        let address = self.address()?;
        let options = self.get_options();
        dispatcher::get(&mut self.transport, &address, command, &options)
    }

    /// Send a get request and decode the reply as `R`
    ///
    /// # Examples
    ///
    /// ```
    /// use ds9_rust::io::mock::MockTransport;
    /// use ds9_rust::io::Session;
    ///
    /// let mut mock = MockTransport::new();
    /// mock.on_get_text("fits size", "1024 768\n");
    ///
    /// let mut session = Session::new(mock);
    /// let [width, height]: [usize; 2] = session.get("fits size")?;
    /// assert_eq!((width, height), (1024, 768));
    /// # Ok::<(), ds9_rust::Ds9Error>(())
    /// ```
    pub fn get<R: FromReply>(&mut self, command: &str) -> Result<R> {
        R::from_reply(self.get_reply(command)?)
    }

    /// Reply payload as text, verbatim
    pub fn get_text(&mut self, command: &str) -> Result<String> {
        Ok(self.get_reply(command)?.text()?.to_string())
    }

    /// Send a get request and decode the reply as described by `target`
    pub fn get_as(&mut self, command: &str, target: &TargetType) -> Result<Decoded> {
        decode(self.get_reply(command)?, target)
    }

    /// Send a get request whose reply is a raw array of known shape
    pub fn get_array<E: PixelElement>(
        &mut self,
        command: &str,
        shape: &[usize],
    ) -> Result<ArrayD<E>> {
        let reply = self.get_reply(command)?;
        decode_array(&reply, shape, self.config.order, self.config.endian.resolve())
    }

    /// Send a set request without payload
    pub fn set(&mut self, command: &str) -> Result<Vec<(String, Option<String>)>> {
        self.send(command, None)
    }

    /// Send a set request followed by `data`
    pub fn set_with_data(
        &mut self,
        command: &str,
        data: &[u8],
    ) -> Result<Vec<(String, Option<String>)>> {
        self.send(command, Some(data))
    }

    fn send(
        &mut self,
        command: &str,
        data: Option<&[u8]>,
    ) -> Result<Vec<(String, Option<String>)>> {
        if command.trim().is_empty() {
            return Ok(Vec::new());
        }
        let address = self.address()?;
        let options = self.set_options();
        dispatcher::set(&mut self.transport, &address, command, data, &options)
    }

    /// Display `array` in the current frame
    ///
    /// Elements outside the supported pixel types are widened first. Fails
    /// with `UnsupportedType` unless the array is 2-D or 3-D.
    ///
    /// # Examples
    ///
    /// ```
    /// use ds9_rust::io::mock::MockTransport;
    /// use ds9_rust::io::Session;
    /// use ndarray::arr2;
    ///
    /// let mut session = Session::new(MockTransport::new());
    /// session.set_array(&arr2(&[[1u8, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]]))?;
    ///
    /// let sent = &session.transport().requests()[0];
    /// assert!(sent.command.starts_with("array [xdim=4,ydim=3,bitpix=8,endian="));
    /// # Ok::<(), ds9_rust::Ds9Error>(())
    /// ```
    pub fn set_array<A, S, D>(
        &mut self,
        array: &ArrayBase<S, D>,
    ) -> Result<Vec<(String, Option<String>)>>
    where
        A: IntoPixel,
        S: Data<Elem = A>,
        D: Dimension,
    {
        let (descriptor, data) = encode_array(array, self.config.order, self.config.endian)?;
        debug!("Sending {} image ({} bytes)", descriptor, data.len());
        self.set_with_data(&command!("array", &descriptor), &data)
    }

    /// Fetch the displayed image
    ///
    /// Three requests: `fits bitpix`, `fits size`, then the raw `array`.
    /// Returns `None` without requesting pixels when the current frame is
    /// empty (bitpix 0 or a zero dimension).
    pub fn get_image(&mut self) -> Result<Option<PixelArray>> {
        let code: i32 = self.get("fits bitpix")?;
        let dims: Vec<usize> = self.get("fits size")?;
        if code == 0 || dims.is_empty() || dims.contains(&0) {
            debug!("Frame is empty (bitpix {}, size {:?})", code, dims);
            return Ok(None);
        }

        let bitpix = Bitpix::from_code(code)?;
        let byte_order = self.config.endian.resolve();
        let descriptor = ArrayDescriptor::new(&dims, bitpix, byte_order)?;

        let reply = self.get_reply(&command!("array", byte_order))?;
        debug!("Received {} image ({} bytes)", descriptor, reply.len());
        PixelArray::decode(&descriptor, &reply.data, self.config.order).map(Some)
    }

    /// Fetch the displayed image as pixels of type `E`
    ///
    /// Fails with `UnsupportedType` if the image is not stored as `E`.
    pub fn get_image_as<E: PixelElement>(&mut self) -> Result<Option<ArrayD<E>>> {
        self.get_image()?.map(PixelArray::into_typed).transpose()
    }
}

fn no_access_point(template: &str) -> Ds9Error {
    Ds9Error::Connection(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no access point matches {}", template),
    ))
}
