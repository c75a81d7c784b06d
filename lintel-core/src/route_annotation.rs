// The @route annotation

use crate::annotation::{Annotation, AnnotationTarget, Subject};
use crate::class::Class;
use crate::handler::Handler;
use crate::routing::Router;
use crate::{Error, RouteMethod, Service};
use std::sync::Arc;

/// Registers routes declared on service methods
///
/// ```text
/// /**
///  * @route GET /books/?
///  */
/// ```
///
/// adds `GET /books/?` bound to the documented method of the owning service.
pub struct RouteAnnotation {
    router: Arc<Router>,
}

impl Service for RouteAnnotation {
    const KEY: &'static str = "lintel::RouteAnnotation";
}

impl RouteAnnotation {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn class() -> Class<RouteAnnotation> {
        Class::new(Self::KEY)
            .inject(Router::KEY)
            .implements(<dyn Annotation>::KEY, |annotation| annotation as Arc<dyn Annotation>)
            .construct(|args| Ok(RouteAnnotation::new(args.service::<Router>()?)))
    }
}

impl Annotation for RouteAnnotation {
    fn types(&self) -> Vec<AnnotationTarget> {
        vec![AnnotationTarget::Method]
    }

    fn name(&self) -> &str {
        "route"
    }

    fn regex(&self) -> &str {
        r"(GET|POST|OPTIONS|PUT|DELETE|PATCH|BOTH)\s(.*)"
    }

    fn process(
        &self,
        owner: &str,
        subject: Subject<'_>,
        comment: &str,
        captures: &[Option<String>],
    ) -> Result<(), Error> {
        let (Some(Some(method)), Some(Some(path))) = (captures.get(1), captures.get(2)) else {
            return Err(Error::Annotation(format!(
                "Can't find valid route in: {}\nA valid route example: @route GET /api/something",
                comment
            )));
        };
        let method: RouteMethod = method.parse()?;
        let path = path.replace(' ', "");
        self.router
            .add(&path, Handler::bound(owner, subject.name()), method)
    }
}
