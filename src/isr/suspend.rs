use core::fmt;

/// Interrupt sources that would add latency to the edge handler (tick timer, serial
/// receive, USB) and must be paused for the length of a transaction.
pub trait BackgroundInterrupts {
    /// Whatever is needed to put things back, e.g. the saved mask register.
    type Saved;

    /// Masks the sources, clears their pending flags, and returns the previous state.
    fn suspend(&mut self) -> Self::Saved;

    /// Restores the state returned by [`suspend`](Self::suspend).
    fn restore(&mut self, saved: Self::Saved);
}

/// Nothing to pause.
impl BackgroundInterrupts for () {
    type Saved = ();

    fn suspend(&mut self) -> Self::Saved {}

    fn restore(&mut self, _saved: Self::Saved) {}
}

/// Pauses the sources only when present; see
/// [`InterruptDecoder::for_profile`](crate::isr::InterruptDecoder::for_profile).
impl<B: BackgroundInterrupts> BackgroundInterrupts for Option<B> {
    type Saved = Option<B::Saved>;

    fn suspend(&mut self) -> Self::Saved {
        self.as_mut().map(B::suspend)
    }

    fn restore(&mut self, saved: Self::Saved) {
        if let (Some(background), Some(saved)) = (self.as_mut(), saved) {
            background.restore(saved);
        }
    }
}

/// Keeps background interrupts paused until dropped.
///
/// Restoring happens in `Drop`, so every exit from the transaction, early return
/// included, brings the tick timer and USB back.
pub struct Suspended<'a, B: BackgroundInterrupts> {
    background: &'a mut B,
    saved: Option<B::Saved>,
}

impl<'a, B: BackgroundInterrupts> Suspended<'a, B> {
    /// Pauses `background` until the guard is dropped.
    pub fn new(background: &'a mut B) -> Self {
        let saved = background.suspend();
        Self {
            background,
            saved: Some(saved),
        }
    }
}

impl<B: BackgroundInterrupts> Drop for Suspended<'_, B> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.background.restore(saved);
        }
    }
}

impl<B: BackgroundInterrupts> fmt::Debug for Suspended<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspended")
            .field("active", &self.saved.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Mask {
        register: u8,
        restores: usize,
    }

    impl BackgroundInterrupts for Mask {
        type Saved = u8;

        fn suspend(&mut self) -> u8 {
            let saved = self.register;
            self.register = 0;
            saved
        }

        fn restore(&mut self, saved: u8) {
            self.register = saved;
            self.restores += 1;
        }
    }

    fn bail_early(mask: &mut Mask) -> Result<(), ()> {
        let _guard = Suspended::new(mask);
        Err(())
    }

    #[test]
    fn test_absent_sources_are_left_alone() {
        let mut absent: Option<Mask> = None;
        {
            let _guard = Suspended::new(&mut absent);
        }
        assert!(absent.is_none());

        let mut present = Some(Mask {
            register: 0b0000_0001,
            restores: 0,
        });
        {
            let _guard = Suspended::new(&mut present);
        }
        let mask = present.unwrap();
        assert_eq!(mask.register, 0b0000_0001);
        assert_eq!(mask.restores, 1);
    }

    #[test]
    fn test_guard_restores_on_every_exit() {
        let mut mask = Mask {
            register: 0b0000_0111,
            restores: 0,
        };
        {
            let _guard = Suspended::new(&mut mask);
        }
        assert_eq!(mask.register, 0b0000_0111);
        assert!(bail_early(&mut mask).is_err());
        assert_eq!(mask.register, 0b0000_0111);
        assert_eq!(mask.restores, 2);
    }
}
