//! Tour packages and the booking flow

use crate::backend::ContentBackend;
use crate::error::{ClientError, ClientResult};
use crate::sync::{LoadState, Notice, RecordSync};
use chrono::NaiveDate;
use kerala_core::{Booking, Error, TourPackage};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const LOAD_FAILED: &str = "Failed to load tour packages.";
const BOOKED: &str = "Booking submitted successfully!";
const BOOKING_FAILED: &str = "Failed to submit booking. Please try again.";
const UNKNOWN_PACKAGE: &str = "Unknown Package";

/// A package as a listing shows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourCard {
    /// Package title
    pub title: String,
    /// Package description
    pub description: String,
    /// Display price
    pub price: String,
    /// Resolved image URL
    pub image: Option<String>,
}

/// Read-only listing of tour packages
#[derive(Debug)]
pub struct ToursView<B> {
    backend: Arc<B>,
    sync: RecordSync,
    load: Mutex<LoadState<Vec<TourPackage>>>,
}

impl<B: ContentBackend> ToursView<B> {
    /// Create a view; nothing is fetched until [`Self::load`]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            sync: RecordSync::new("tours"),
            load: Mutex::new(LoadState::NotLoaded),
        }
    }

    /// Fetch every package
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the load state then holds a static message.
    #[instrument(skip(self))]
    pub async fn load(&self) -> ClientResult<()> {
        let ticket = self.sync.next_fetch();
        let result = self.backend.fetch_tours().await;

        if !self.sync.is_current(ticket) {
            return result.map(|_| ());
        }

        match result {
            Ok(packages) => {
                *self.load.lock() = LoadState::Loaded(packages);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Error fetching tours");
                *self.load.lock() = LoadState::Failed(LOAD_FAILED.to_string());
                Err(err)
            }
        }
    }

    /// Result of the last load
    pub fn load_state(&self) -> LoadState<Vec<TourPackage>> {
        self.load.lock().clone()
    }

    /// Loaded packages; empty until loaded
    pub fn packages(&self) -> Vec<TourPackage> {
        self.load.lock().loaded().cloned().unwrap_or_default()
    }

    /// Packages ready for display
    pub fn cards(&self) -> Vec<TourCard> {
        let base_url = self.backend.base_url();
        self.packages()
            .iter()
            .map(|package| TourCard {
                title: package.title.clone(),
                description: package.description.clone(),
                price: package.display_price(),
                image: package.image.as_ref().map(|image| image.resolve(base_url)),
            })
            .collect()
    }

    /// Find a package by title (case-insensitive) or backend key
    pub fn find(&self, name: &str) -> Option<TourPackage> {
        self.packages().into_iter().find(|package| {
            package.title.eq_ignore_ascii_case(name.trim())
                || package.key.as_deref() == Some(name.trim())
        })
    }
}

/// Booking form as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    /// Customer name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Travel date, `YYYY-MM-DD`
    pub date: String,
    /// Party size
    pub people: String,
}

impl BookingForm {
    /// Validate the form and build the request body
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first bad field.
    pub fn to_booking(&self, package: &TourPackage) -> kerala_core::Result<Booking> {
        let name = required("name", &self.name)?;
        let phone = required("phone", &self.phone)?;

        let date = required("date", &self.date)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| Error::validation("date", "Date must be in YYYY-MM-DD format"))?;

        let people = required("people", &self.people)?;
        if !people.parse::<u32>().is_ok_and(|n| n >= 1) {
            return Err(Error::validation(
                "people",
                "Number of people must be a whole number of at least 1",
            ));
        }

        let title = package.title.trim();
        Ok(Booking {
            name: name.to_string(),
            phone: phone.to_string(),
            date: date.to_string(),
            people: people.to_string(),
            package: if title.is_empty() {
                UNKNOWN_PACKAGE.to_string()
            } else {
                title.to_string()
            },
        })
    }
}

fn required<'a>(field: &str, value: &'a str) -> kerala_core::Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(field, "Field is required"));
    }
    Ok(value)
}

/// Where the booking flow is
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BookingState {
    /// No package selected
    #[default]
    Idle,
    /// A package is open and the form is being filled in
    Selecting {
        /// Package being booked
        package: TourPackage,
        /// Form contents
        form: BookingForm,
    },
    /// The booking request is in flight
    Submitting {
        /// Package being booked
        package: TourPackage,
        /// Form contents as sent
        form: BookingForm,
    },
}

#[derive(Debug, Default)]
struct Inner {
    state: BookingState,
    notice: Option<Notice>,
}

/// Booking modal: pick a package, fill the form, submit once
#[derive(Debug)]
pub struct BookingFlow<B> {
    backend: Arc<B>,
    inner: Mutex<Inner>,
}

/// Puts the flow back into `Selecting` unless the booking went through,
/// including when the submit future is dropped mid-flight
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
    armed: bool,
}

impl InFlight<'_> {
    fn succeed(mut self, notice: Notice) {
        self.armed = false;
        let mut inner = self.inner.lock();
        inner.state = BookingState::Idle;
        inner.notice = Some(notice);
    }

    fn fail(self, notice: Notice) {
        self.inner.lock().notice = Some(notice);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        inner.state = match std::mem::take(&mut inner.state) {
            BookingState::Submitting { package, form } => BookingState::Selecting { package, form },
            other => other,
        };
    }
}

impl<B: ContentBackend> BookingFlow<B> {
    /// Idle flow
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Current state
    pub fn state(&self) -> BookingState {
        self.inner.lock().state.clone()
    }

    /// Last notice, cleared once read
    pub fn take_notice(&self) -> Option<Notice> {
        self.inner.lock().notice.take()
    }

    /// Open the form for `package` with empty fields
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] while a booking is being submitted.
    pub fn open(&self, package: TourPackage) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        if matches!(inner.state, BookingState::Submitting { .. }) {
            return Err(ClientError::busy("booking"));
        }
        inner.state = BookingState::Selecting {
            package,
            form: BookingForm::default(),
        };
        Ok(())
    }

    /// Close the form, discarding what was typed
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] while a booking is being submitted.
    pub fn close(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        if matches!(inner.state, BookingState::Submitting { .. }) {
            return Err(ClientError::busy("booking"));
        }
        inner.state = BookingState::Idle;
        Ok(())
    }

    fn edit(&self, f: impl FnOnce(&mut BookingForm)) -> ClientResult<()> {
        match &mut self.inner.lock().state {
            BookingState::Selecting { form, .. } => {
                f(form);
                Ok(())
            }
            BookingState::Submitting { .. } => Err(ClientError::busy("booking")),
            BookingState::Idle => Err(ClientError::invalid_state("no package selected")),
        }
    }

    /// Set the customer name
    ///
    /// # Errors
    ///
    /// Fails unless a package is open and nothing is in flight.
    pub fn set_name(&self, name: impl Into<String>) -> ClientResult<()> {
        let name = name.into();
        self.edit(|form| form.name = name)
    }

    /// Set the contact phone
    ///
    /// # Errors
    ///
    /// Fails unless a package is open and nothing is in flight.
    pub fn set_phone(&self, phone: impl Into<String>) -> ClientResult<()> {
        let phone = phone.into();
        self.edit(|form| form.phone = phone)
    }

    /// Set the travel date
    ///
    /// # Errors
    ///
    /// Fails unless a package is open and nothing is in flight.
    pub fn set_date(&self, date: impl Into<String>) -> ClientResult<()> {
        let date = date.into();
        self.edit(|form| form.date = date)
    }

    /// Set the party size
    ///
    /// # Errors
    ///
    /// Fails unless a package is open and nothing is in flight.
    pub fn set_people(&self, people: impl Into<String>) -> ClientResult<()> {
        let people = people.into();
        self.edit(|form| form.people = people)
    }

    /// Validate and send the booking with `POST /api/bookings`
    ///
    /// Success closes the flow. Failure returns to `Selecting` with the form
    /// intact so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] for a second submit while one is in
    /// flight, [`ClientError::InvalidState`] when no package is open, a
    /// validation error, or the backend error.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> ClientResult<Notice> {
        let booking = {
            let mut inner = self.inner.lock();
            let (package, form) = match &inner.state {
                BookingState::Selecting { package, form } => (package.clone(), form.clone()),
                BookingState::Submitting { .. } => {
                    warn!("Booking already being submitted; ignoring duplicate submit");
                    return Err(ClientError::busy("booking"));
                }
                BookingState::Idle => {
                    return Err(ClientError::invalid_state("no package selected"));
                }
            };

            let booking = form.to_booking(&package)?;
            inner.state = BookingState::Submitting { package, form };
            booking
        };

        let in_flight = InFlight {
            inner: &self.inner,
            armed: true,
        };

        info!(package = %booking.package, "Submitting booking");
        match self.backend.create_booking(&booking).await {
            Ok(_) => {
                let notice = Notice::success(BOOKED);
                in_flight.succeed(notice.clone());
                Ok(notice)
            }
            Err(err) => {
                warn!(error = %err, "Booking failed");
                in_flight.fail(Notice::error(BOOKING_FAILED));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockBackend};
    use kerala_core::ImageRef;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tokio::time::Duration;

    fn munnar() -> TourPackage {
        TourPackage {
            key: Some("p1".to_string()),
            title: "Munnar Hills".to_string(),
            description: "Tea gardens and misty peaks".to_string(),
            price: serde_json::json!(12000),
            image: Some(ImageRef::new("/uploads/munnar.jpg")),
        }
    }

    fn flow() -> (Arc<MockBackend>, BookingFlow<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        (Arc::clone(&backend), BookingFlow::new(backend))
    }

    fn fill(flow: &BookingFlow<MockBackend>) {
        flow.set_name("A").unwrap();
        flow.set_phone("123").unwrap();
        flow.set_date("2024-01-01").unwrap();
        flow.set_people("2").unwrap();
    }

    #[tokio::test]
    async fn test_view_lists_packages_with_resolved_images() {
        let backend = Arc::new(MockBackend::new().with_tours(vec![munnar()]));
        let view = ToursView::new(backend);
        view.load().await.unwrap();

        let cards = view.cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Munnar Hills");
        assert_eq!(
            cards[0].image.as_deref(),
            Some("http://localhost:5000/uploads/munnar.jpg")
        );
        assert_eq!(view.find("munnar hills"), Some(munnar()));
        assert_eq!(view.find("p1"), Some(munnar()));
        assert_eq!(view.find("Alleppey"), None);
    }

    #[tokio::test]
    async fn test_view_load_failure() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(500, "down");
        let view = ToursView::new(backend);

        assert!(view.load().await.is_err());
        assert_eq!(view.load_state().failure(), Some(LOAD_FAILED));
        assert!(view.packages().is_empty());
    }

    #[tokio::test]
    async fn test_booking_sends_one_post_and_closes() {
        let (backend, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);

        let notice = flow.submit().await.unwrap();

        assert_eq!(notice, Notice::success(BOOKED));
        assert_eq!(backend.calls(), vec![Call::CreateBooking]);
        assert_eq!(
            backend.bookings(),
            vec![Booking {
                name: "A".to_string(),
                phone: "123".to_string(),
                date: "2024-01-01".to_string(),
                people: "2".to_string(),
                package: "Munnar Hills".to_string(),
            }]
        );
        assert_eq!(flow.state(), BookingState::Idle);
    }

    #[tokio::test]
    async fn test_name_and_phone_are_trimmed() {
        let (backend, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);
        flow.set_name("  Anu  ").unwrap();
        flow.set_phone(" 98470 ").unwrap();

        flow.submit().await.unwrap();
        let sent = &backend.bookings()[0];
        assert_eq!(sent.name, "Anu");
        assert_eq!(sent.phone, "98470");
    }

    #[rstest]
    #[case::missing_name("name", "")]
    #[case::blank_phone("phone", "   ")]
    #[case::bad_date("date", "01/01/2024")]
    #[case::impossible_date("date", "2024-02-30")]
    #[case::zero_people("people", "0")]
    #[case::words_for_people("people", "two")]
    #[tokio::test]
    async fn test_invalid_form_never_reaches_backend(#[case] field: &str, #[case] value: &str) {
        let (backend, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);
        let edited = match field {
            "name" => flow.set_name(value),
            "phone" => flow.set_phone(value),
            "date" => flow.set_date(value),
            _ => flow.set_people(value),
        };
        edited.unwrap();

        let err = flow.submit().await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Core(Error::Validation { field: ref f, .. }) if f == field
        ));
        assert!(backend.calls().is_empty());
        assert!(matches!(flow.state(), BookingState::Selecting { .. }));
    }

    #[tokio::test]
    async fn test_untitled_package_falls_back() {
        let (backend, flow) = flow();
        let mut package = munnar();
        package.title = String::new();
        flow.open(package).unwrap();
        fill(&flow);

        flow.submit().await.unwrap();
        assert_eq!(backend.bookings()[0].package, UNKNOWN_PACKAGE);
    }

    #[tokio::test]
    async fn test_failure_returns_to_selecting_with_form() {
        let (backend, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);

        backend.fail_next(500, "Internal Server Error");
        assert!(flow.submit().await.is_err());

        match flow.state() {
            BookingState::Selecting { package, form } => {
                assert_eq!(package, munnar());
                assert_eq!(form.name, "A");
                assert_eq!(form.people, "2");
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(flow.take_notice(), Some(Notice::error(BOOKING_FAILED)));

        assert!(flow.submit().await.is_ok());
        assert_eq!(backend.call_count(&Call::CreateBooking), 2);
    }

    #[tokio::test]
    async fn test_submit_without_package() {
        let (backend, flow) = flow();

        assert!(matches!(
            flow.submit().await,
            Err(ClientError::InvalidState { .. })
        ));
        assert!(flow.set_name("A").is_err());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_close_discards_form() {
        let (_, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);
        flow.close().unwrap();

        assert_eq!(flow.state(), BookingState::Idle);
        flow.open(munnar()).unwrap();
        assert!(matches!(
            flow.state(),
            BookingState::Selecting { ref form, .. } if *form == BookingForm::default()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_is_busy() {
        let (backend, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);
        backend.delay_next(Duration::from_millis(100));

        let (first, second) = tokio::join!(flow.submit(), flow.submit());

        assert!(first.is_ok());
        assert!(matches!(second, Err(ClientError::Busy { .. })));
        assert_eq!(backend.call_count(&Call::CreateBooking), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_submit_restores_selecting() {
        let (backend, flow) = flow();
        flow.open(munnar()).unwrap();
        fill(&flow);
        backend.delay_next(Duration::from_secs(60));

        let timed_out = tokio::time::timeout(Duration::from_millis(10), flow.submit()).await;

        assert!(timed_out.is_err());
        assert!(matches!(flow.state(), BookingState::Selecting { .. }));
    }
}
