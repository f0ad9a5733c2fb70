use crate::{remap, Error, Pic, Ready, Uninit};

enum State<const A: u8, const B: u8> {
    Uninit(Option<(Pic<Uninit, A>, Pic<Uninit, B>)>),
    Ready((Pic<Ready, A>, Pic<Ready, B>)),
}

/// The master/slave pair of a PC, master lines on `A..A + 8`, slave lines on `B..B + 8`.
pub struct Chained<const A: u8, const B: u8> {
    state: State<A, B>,
}

impl<const A: u8, const B: u8> Chained<A, B> {
    #[must_use]
    pub const fn uninit() -> Self {
        Self {
            state: State::Uninit(Some((Pic::master(), Pic::slave()))),
        }
    }

    /// Remaps both controllers, keeping the masks they had.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyInitialized`] on a second call.
    pub fn init(&mut self) -> Result<(), Error> {
        match self.state {
            State::Uninit(ref mut pics) => {
                let (master, slave) = pics.take().ok_or(Error::Uninitialized)?;
                let masks = (master.read_mask(), slave.read_mask());
                self.state = State::Ready(remap(master, slave, masks));
                debug!(
                    "pic remapped to {:#x}/{:#x}, masks {:#010b}/{:#010b}",
                    A, B, masks.0, masks.1
                );
                Ok(())
            }
            State::Ready(_) => Err(Error::AlreadyInitialized),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    #[must_use]
    pub const fn handles_interrupt(&self, vector: u8) -> bool {
        vector.wrapping_sub(A) < 8 || vector.wrapping_sub(B) < 8
    }

    /// Acknowledges `vector`, the slave first when the line is behind it.
    ///
    /// # Errors
    ///
    /// [`Error::NotPicVector`] if neither controller raises `vector`,
    /// [`Error::Uninitialized`] before [`Self::init`].
    pub fn notify_end_of_interrupt(&mut self, vector: u8) -> Result<(), Error> {
        if !self.handles_interrupt(vector) {
            return Err(Error::NotPicVector(vector));
        }
        let (master, slave) = match self.state {
            State::Ready(ref mut pics) => pics,
            State::Uninit(_) => return Err(Error::Uninitialized),
        };

        if slave.handles_interrupt(vector) {
            slave.eoi();
        }
        master.eoi();
        Ok(())
    }

    /// # Errors
    ///
    /// [`Error::Uninitialized`] before [`Self::init`].
    pub fn set_masks(&mut self, master_mask: u8, slave_mask: u8) -> Result<(), Error> {
        match self.state {
            State::Ready((ref mut master, ref mut slave)) => {
                master.set_mask(master_mask);
                slave.set_mask(slave_mask);
                Ok(())
            }
            State::Uninit(_) => Err(Error::Uninitialized),
        }
    }

    /// # Errors
    ///
    /// [`Error::Uninitialized`] before [`Self::init`].
    pub fn masks(&self) -> Result<(u8, u8), Error> {
        match self.state {
            State::Ready((ref master, ref slave)) => Ok((master.mask(), slave.mask())),
            State::Uninit(_) => Err(Error::Uninitialized),
        }
    }
}
